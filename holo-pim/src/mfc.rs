//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! MFC projection (§3.5, §4.9): collapses MRE state into the
//! `(iif, olist)` tuple the kernel forwarding cache actually needs, and
//! tracks the idle / SPT-switch dataflow monitors layered on top of it.

use std::net::IpAddr;
use std::time::Instant;

use crate::collections::VifId;
use crate::config::defaults;
use crate::mre::{Mre, MifSet};

pub const VIF_INDEX_INVALID: u16 = u16::MAX;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct MfcKey {
    pub source: IpAddr,
    pub group: IpAddr,
}

#[derive(Clone, Debug)]
pub struct MfcEntry {
    pub key: MfcKey,
    pub iif_vif_index: u16,
    pub olist: MifSet,
    pub olist_disable_wrongvif: MifSet,
    pub rp_addr: Option<IpAddr>,
    pub has_idle_dataflow_monitor: bool,
    pub has_spt_switch_dataflow_monitor: bool,
    pub has_forced_deletion: bool,
    // Last tuple actually pushed to the kernel, so bit-identical
    // updates can be suppressed (§4.9).
    installed: Option<(u16, MifSet, MifSet)>,
}

impl MfcEntry {
    pub fn new(key: MfcKey) -> MfcEntry {
        MfcEntry {
            key,
            iif_vif_index: VIF_INDEX_INVALID,
            olist: MifSet::new(),
            olist_disable_wrongvif: MifSet::new(),
            rp_addr: None,
            has_idle_dataflow_monitor: false,
            has_spt_switch_dataflow_monitor: false,
            has_forced_deletion: false,
            installed: None,
        }
    }

    /// Returns `true` if `(iif, olist, olist_disable_wrongvif)` differs
    /// from what was last pushed to the kernel, i.e. a write is
    /// actually needed.
    pub fn needs_kernel_write(&self) -> bool {
        self.installed != Some((self.iif_vif_index, self.olist, self.olist_disable_wrongvif))
    }

    pub fn mark_installed(&mut self) {
        self.installed = Some((self.iif_vif_index, self.olist, self.olist_disable_wrongvif));
    }
}

/// Inputs to the projection that come from the MRE layer's resolved
/// RPF state rather than from the MFC entry itself, since the MFC
/// table has no independent notion of RPF neighbors (§4.9).
pub struct ProjectionInputs {
    pub rpf_interface_s: Option<VifId>,
    pub rpf_interface_rp: Option<VifId>,
    pub is_source_directly_connected: bool,
    pub is_switch_to_spt_desired: bool,
    pub inherited_olist_sg: MifSet,
    pub inherited_olist_sg_rpt: MifSet,
}

fn vif_index(id: Option<VifId>, index_of: impl Fn(VifId) -> u16) -> u16 {
    id.map(index_of).unwrap_or(VIF_INDEX_INVALID)
}

/// Computes the `(iif, olist, olist_disable_wrongvif)` tuple for one
/// `(S,G)` MRE (§4.9). `index_of` resolves a [`VifId`] to its stable
/// vif-index, since the projection only ever deals in indices.
pub fn project(
    mre: &Mre,
    inputs: &ProjectionInputs,
    index_of: impl Fn(VifId) -> u16,
) -> (u16, MifSet, MifSet) {
    let (iif, mut olist) = if mre.spt_bit || inputs.is_source_directly_connected {
        (
            vif_index(inputs.rpf_interface_s, &index_of),
            inputs.inherited_olist_sg,
        )
    } else {
        (
            vif_index(inputs.rpf_interface_rp, &index_of),
            inputs.inherited_olist_sg_rpt,
        )
    };

    if iif != VIF_INDEX_INVALID {
        olist.reset(iif);
    }

    let mut disable_wrongvif = olist.not();
    if inputs.is_switch_to_spt_desired && inputs.rpf_interface_s != inputs.rpf_interface_rp {
        let new_iif = vif_index(inputs.rpf_interface_s, &index_of);
        if new_iif != VIF_INDEX_INVALID {
            disable_wrongvif.reset(new_iif);
        }
    }

    (iif, olist, disable_wrongvif)
}

/// A dataflow monitor threshold as installed in the kernel (§6.2,
/// §4.9): either "at most N bytes in T seconds" (idle) or "at least N
/// bytes in T seconds" (SPT-switch).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MonitorDirection {
    AtMost,
    AtLeast,
}

#[derive(Clone, Copy, Debug)]
pub struct DataflowMonitor {
    pub direction: MonitorDirection,
    pub threshold_bytes: u64,
    pub interval: std::time::Duration,
}

pub fn idle_monitor(rp_keepalive: bool) -> DataflowMonitor {
    DataflowMonitor {
        direction: MonitorDirection::AtMost,
        threshold_bytes: 0,
        interval: std::time::Duration::from_secs(if rp_keepalive {
            defaults::RP_KEEPALIVE_PERIOD as u64
        } else {
            defaults::KEEPALIVE_PERIOD as u64
        }),
    }
}

pub fn spt_switch_monitor(
    threshold_bytes: u64,
    interval: std::time::Duration,
) -> DataflowMonitor {
    DataflowMonitor {
        direction: MonitorDirection::AtLeast,
        threshold_bytes,
        interval,
    }
}

/// Keepalive timer bookkeeping for an `(S,G)` MRE (§3.5, §4.9): a data
/// upcall or idle-monitor refresh (re)arms the deadline; expiry without
/// a refresh means the entry is torn down.
#[derive(Clone, Copy, Debug, Default)]
pub struct Keepalive {
    pub deadline: Option<Instant>,
}

impl Keepalive {
    pub fn rearm(&mut self, now: Instant, period: std::time::Duration) {
        self.deadline = Some(now + period);
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(d) if d <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mre::{DownstreamState, IfaceMreState};

    fn vid(n: u32) -> VifId {
        let mut arena = crate::collections::Arena::<crate::iface::Vif>::default();
        let mut last = None;
        for _ in 0..=n {
            last = Some(arena.insert(crate::iface::Vif::new(
                "x".into(),
                0,
                crate::config::VifCfg::default(),
            )));
        }
        last.unwrap()
    }

    #[test]
    fn iif_never_appears_in_olist() {
        let mut mre = Mre::default();
        mre.iface.insert(1, IfaceMreState {
            downstream: DownstreamState::Join,
            ..Default::default()
        });
        mre.iface.insert(2, IfaceMreState {
            downstream: DownstreamState::Join,
            ..Default::default()
        });
        mre.spt_bit = true;

        let rpf_s = vid(0);
        let inputs = ProjectionInputs {
            rpf_interface_s: Some(rpf_s),
            rpf_interface_rp: None,
            is_source_directly_connected: false,
            is_switch_to_spt_desired: false,
            inherited_olist_sg: mre.immediate_olist(),
            inherited_olist_sg_rpt: MifSet::new(),
        };

        let (iif, olist, _) = project(&mre, &inputs, |_| 1);
        assert_eq!(iif, 1);
        assert!(!olist.test(1));
        assert!(olist.test(2));
    }

    #[test]
    fn invalid_iif_falls_back_to_rpt_branch_when_not_spt() {
        let mre = Mre::default();
        let inputs = ProjectionInputs {
            rpf_interface_s: None,
            rpf_interface_rp: None,
            is_source_directly_connected: false,
            is_switch_to_spt_desired: false,
            inherited_olist_sg: MifSet::new(),
            inherited_olist_sg_rpt: MifSet::new(),
        };
        let (iif, _, _) = project(&mre, &inputs, |_| VIF_INDEX_INVALID);
        assert_eq!(iif, VIF_INDEX_INVALID);
    }

    #[test]
    fn bit_identical_write_is_suppressed() {
        let mut entry = MfcEntry::new(MfcKey {
            source: "10.0.0.1".parse().unwrap(),
            group: "239.1.1.1".parse().unwrap(),
        });
        entry.iif_vif_index = 1;
        assert!(entry.needs_kernel_write());
        entry.mark_installed();
        assert!(!entry.needs_kernel_write());
    }
}
