//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Multicast Routing Entry (§3.4) and the fixed-width vif bitset (§3.1).

use std::net::IpAddr;
use std::time::Instant;

use crate::collections::{NbrId, VifId};

/// Maximum number of vifs a daemon instance can manage, mirroring the
/// Linux kernel's `MAXVIFS`. [`MifSet`] is sized to this bound.
pub const MAX_VIFS: usize = 32;

/// A fixed-width bitset indexed by vif-index (§3.1).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MifSet(u32);

impl MifSet {
    pub const fn new() -> MifSet {
        MifSet(0)
    }

    pub fn set(&mut self, vif_index: u16) {
        self.0 |= 1 << vif_index;
    }

    pub fn reset(&mut self, vif_index: u16) {
        self.0 &= !(1 << vif_index);
    }

    pub fn test(&self, vif_index: u16) -> bool {
        self.0 & (1 << vif_index) != 0
    }

    pub fn any(&self) -> bool {
        self.0 != 0
    }

    pub fn none(&self) -> bool {
        self.0 == 0
    }

    pub fn union(&self, other: MifSet) -> MifSet {
        MifSet(self.0 | other.0)
    }

    pub fn intersection(&self, other: MifSet) -> MifSet {
        MifSet(self.0 & other.0)
    }

    pub fn xor(&self, other: MifSet) -> MifSet {
        MifSet(self.0 ^ other.0)
    }

    pub fn not(&self) -> MifSet {
        MifSet(!self.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        (0..MAX_VIFS as u16).filter(move |vif| self.test(*vif))
    }
}

/// MRE identity key: `(type, source, group)`. `source` is unused for
/// `Rp` and `Wc`; `Wc`'s group slot is reused to store the group itself
/// per §3.4's "single table" convention, expressed here as a plain tag
/// instead of a source=0 sentinel to keep the type system honest.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum MreKey {
    Rp,
    Wc(IpAddr),
    Sg(IpAddr, IpAddr),
    SgRpt(IpAddr, IpAddr),
}

impl MreKey {
    pub fn group(&self) -> IpAddr {
        match self {
            MreKey::Rp => unreachable!("RP entry has no group"),
            MreKey::Wc(g) => *g,
            MreKey::Sg(_, g) | MreKey::SgRpt(_, g) => *g,
        }
    }

    pub fn source(&self) -> Option<IpAddr> {
        match self {
            MreKey::Rp | MreKey::Wc(_) => None,
            MreKey::Sg(s, _) | MreKey::SgRpt(s, _) => Some(*s),
        }
    }
}

/// Selects which MRE type(s) `pim_mre_find` is allowed to return or
/// create (§4.4).
#[derive(Clone, Copy, Debug, Default)]
pub struct MreFindFlags {
    pub rp: bool,
    pub wc: bool,
    pub sg: bool,
    pub sg_rpt: bool,
    pub create: bool,
}

/// Downstream per-interface FSM state (§3.4, §4.5).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DownstreamState {
    #[default]
    NoInfo,
    Join,
    PrunePending,
}

/// Upstream register FSM state (§3.4, §4.10).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RegisterState {
    #[default]
    NoInfo,
    Join,
    JoinPending,
    Prune,
}

/// Per-interface Assert FSM state (§4.7).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AssertState {
    #[default]
    NoInfo,
    IAmWinner,
    IAmLoser,
}

/// Assert metric tuple, compared lexicographically (smaller preference
/// wins; address ties broken by largest address) per §4.7.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AssertMetric {
    pub preference: u32,
    pub metric: u32,
    pub addr: IpAddr,
}

impl AssertMetric {
    /// Returns `true` if `self` beats `other` as an assert winner.
    pub fn is_better_than(&self, other: &AssertMetric) -> bool {
        (self.preference, self.metric)
            .cmp(&(other.preference, other.metric))
            .then_with(|| self.addr.cmp(&other.addr).reverse())
            == std::cmp::Ordering::Less
    }
}

/// Per-vif downstream/assert state bundled with its timers. Kept
/// separate from the MRE's scalar fields so it can live in a
/// `BTreeMap<u16, IfaceMreState>` keyed by vif-index without bloating
/// entries that only ever touch one or two interfaces.
#[derive(Clone, Debug, Default)]
pub struct IfaceMreState {
    pub downstream: DownstreamState,
    // SG_RPT only: intermediate states used while committing a J/P batch.
    pub prune_tmp: bool,
    pub prune_pending_tmp: bool,
    pub expiry_deadline: Option<Instant>,
    pub prune_pending_deadline: Option<Instant>,
    pub assert: AssertState,
    pub assert_winner: Option<AssertMetric>,
    pub assert_deadline: Option<Instant>,
    pub local_receiver_include: bool,
}

/// A Multicast Routing Entry (§3.4). One struct carries the union of
/// fields needed by all four entry types, per the "flatten deep
/// inheritance" design note (§9): the discriminant lives in the owning
/// [`MreKey`], not duplicated here.
#[derive(Clone, Debug, Default)]
pub struct Mre {
    // Per-vif downstream/assert FSMs, one entry per vif that has ever
    // seen traffic for this MRE.
    pub iface: std::collections::BTreeMap<u16, IfaceMreState>,

    // Upstream state (§3.4).
    pub join_desired: bool,
    pub prune_desired_sg_rpt: bool,
    pub could_register: bool,
    pub spt_bit: bool,
    pub register_state: RegisterState,
    pub upstream_join_deadline: Option<Instant>,
    pub override_deadline: Option<Instant>,

    // RP binding (§3.4).
    pub rp_addr: Option<IpAddr>,
    pub rpf_nbr_rp: Option<NbrId>,
    pub rpf_nbr_s: Option<NbrId>,
    pub rpf_interface_rp: Option<VifId>,
    pub rpf_interface_s: Option<VifId>,

    // Keepalive (SG only).
    pub keepalive_deadline: Option<Instant>,
    pub is_kat_set_to_rp_keepalive_period: bool,

    // Lifecycle.
    pub is_task_delete_pending: bool,
}

impl Mre {
    /// The set of vifs in `Join` downstream state, ORed with any
    /// locally-included receiver, i.e. the immediate olist (§4.9 calls
    /// this `immediate_olist`).
    pub fn immediate_olist(&self) -> MifSet {
        let mut olist = MifSet::new();
        for (vif, state) in &self.iface {
            if state.downstream == DownstreamState::Join
                || state.local_receiver_include
            {
                olist.set(*vif);
            }
        }
        olist
    }

    pub fn joins(&self) -> MifSet {
        let mut set = MifSet::new();
        for (vif, state) in &self.iface {
            if state.downstream == DownstreamState::Join {
                set.set(*vif);
            }
        }
        set
    }

    pub fn prunes(&self) -> MifSet {
        let mut set = MifSet::new();
        for (vif, state) in &self.iface {
            if state.downstream == DownstreamState::PrunePending {
                set.set(*vif);
            }
        }
        set
    }

    /// P1: `joins ∩ prunes = ∅` holds trivially here since `downstream`
    /// is a single enum per interface rather than two independent sets;
    /// this method exists so callers (and tests) can assert the
    /// invariant explicitly at integration points that still think in
    /// terms of separate join/prune bitsets.
    pub fn joins_prunes_disjoint(&self) -> bool {
        self.joins().intersection(self.prunes()).none()
    }

    /// An MRE may be deleted only once every timer is quiescent, every
    /// per-interface FSM is `NoInfo`, and no pending task still targets
    /// it (§3.4).
    pub fn is_deletable(&self) -> bool {
        !self.is_task_delete_pending
            && self.keepalive_deadline.is_none()
            && self.upstream_join_deadline.is_none()
            && self.override_deadline.is_none()
            && self.iface.values().all(|s| {
                s.downstream == DownstreamState::NoInfo
                    && s.assert == AssertState::NoInfo
                    && s.expiry_deadline.is_none()
                    && s.prune_pending_deadline.is_none()
                    && s.assert_deadline.is_none()
            })
    }

    pub fn iface_entry(&mut self, vif_index: u16) -> &mut IfaceMreState {
        self.iface.entry(vif_index).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mifset_basic_ops_round_trip() {
        let mut set = MifSet::new();
        assert!(set.none());
        set.set(3);
        set.set(5);
        assert!(set.test(3));
        assert!(set.test(5));
        assert!(!set.test(4));
        assert_eq!(set.not().test(4), true);
        assert_eq!(set.not().test(3), false);
        set.reset(3);
        assert!(!set.test(3));
        assert!(set.any());
    }

    #[test]
    fn joins_and_prunes_stay_disjoint() {
        let mut mre = Mre::default();
        mre.iface_entry(1).downstream = DownstreamState::Join;
        mre.iface_entry(2).downstream = DownstreamState::PrunePending;
        assert!(mre.joins().test(1));
        assert!(mre.prunes().test(2));
        assert!(mre.joins_prunes_disjoint());
    }

    #[test]
    fn entry_with_pending_deadline_is_not_deletable() {
        let mut mre = Mre::default();
        assert!(mre.is_deletable());
        mre.keepalive_deadline = Some(Instant::now());
        assert!(!mre.is_deletable());
    }

    #[test]
    fn entry_with_non_noinfo_iface_is_not_deletable() {
        let mut mre = Mre::default();
        mre.iface_entry(1).downstream = DownstreamState::Join;
        assert!(!mre.is_deletable());
    }

    #[test]
    fn assert_metric_prefers_lower_preference_then_larger_address() {
        let winner = AssertMetric {
            preference: 10,
            metric: 100,
            addr: "10.0.0.2".parse().unwrap(),
        };
        let loser = AssertMetric {
            preference: 20,
            metric: 100,
            addr: "10.0.0.9".parse().unwrap(),
        };
        assert!(winner.is_better_than(&loser));

        let tie_lower_addr = AssertMetric {
            preference: 10,
            metric: 100,
            addr: "10.0.0.1".parse().unwrap(),
        };
        assert!(winner.is_better_than(&tie_lower_addr));
    }
}
