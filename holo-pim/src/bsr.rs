//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Bootstrap Router state machine and RP-set distribution (§3.7, §4.8).

use std::net::IpAddr;
use std::time::Instant;

use ipnetwork::IpNetwork;

use crate::config::defaults;

/// `(prefix, is_scope_zone)` identity of a BSR zone (§3.7).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ScopeZoneId {
    pub prefix: IpNetwork,
    pub is_scope_zone: bool,
}

#[derive(Clone, Debug)]
pub struct BsrRp {
    pub addr: IpAddr,
    pub priority: u8,
    pub holdtime: u16,
    pub expiry_deadline: Option<Instant>,
}

// Equality ignores `expiry_deadline`: it's local timer bookkeeping, not
// part of the RP's wire identity, which is what codec round-trip tests
// care about.
impl PartialEq for BsrRp {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr
            && self.priority == other.priority
            && self.holdtime == other.holdtime
    }
}
impl Eq for BsrRp {}

#[derive(Clone, Debug)]
pub struct BsrGroupPrefix {
    pub group_prefix: IpNetwork,
    pub expected_rp_count: u8,
    pub rps: Vec<BsrRp>,
}

impl PartialEq for BsrGroupPrefix {
    fn eq(&self, other: &Self) -> bool {
        self.group_prefix == other.group_prefix
            && self.expected_rp_count == other.expected_rp_count
            && self.rps == other.rps
    }
}
impl Eq for BsrGroupPrefix {}

/// Candidate-BSR election state (§4.8).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CandBsrState {
    #[default]
    NoInfo,
    AcceptAny,
    AcceptPreferred,
    CandidateBsr,
    PendingBsr,
    ElectedBsr,
}

/// One of the four disjoint roles a [`BsrZone`] snapshot may carry
/// (§3.7). Config/Active/Expire/Test lists are segregated by the owner
/// rather than by a field on this struct, so a zone's role is implicit
/// in which list it lives in.
#[derive(Clone, Debug)]
pub struct BsrZone {
    pub zone_id: ScopeZoneId,
    pub state: CandBsrState,
    pub elected_bsr_addr: Option<IpAddr>,
    pub elected_bsr_priority: u8,
    pub hash_mask_len: u8,
    pub fragment_tag: u16,
    pub cand_bsr_addr: Option<IpAddr>,
    pub cand_bsr_priority: u8,
    pub group_prefixes: Vec<BsrGroupPrefix>,
    pub bs_deadline: Option<Instant>,
    pub scope_zone_expiry_deadline: Option<Instant>,
    pub cand_rp_adv_deadline: Option<Instant>,
}

impl BsrZone {
    pub fn new(zone_id: ScopeZoneId) -> BsrZone {
        BsrZone {
            zone_id,
            state: CandBsrState::NoInfo,
            elected_bsr_addr: None,
            elected_bsr_priority: defaults::LOWEST_BSR_PRIORITY,
            hash_mask_len: 0,
            fragment_tag: 0,
            cand_bsr_addr: None,
            cand_bsr_priority: defaults::LOWEST_BSR_PRIORITY,
            group_prefixes: Vec::new(),
            bs_deadline: None,
            scope_zone_expiry_deadline: None,
            cand_rp_adv_deadline: None,
        }
    }

    /// True if the local router is configured as a Cand-BSR for this
    /// zone.
    pub fn is_candidate_bsr(&self) -> bool {
        self.cand_bsr_addr.is_some()
    }
}

/// Preferred-BSR comparison (§4.8): larger priority wins, tiebreak by
/// larger address.
pub fn is_preferred(
    candidate_addr: IpAddr,
    candidate_priority: u8,
    incumbent_addr: IpAddr,
    incumbent_priority: u8,
) -> bool {
    (candidate_priority, candidate_addr) > (incumbent_priority, incumbent_addr)
}

/// Validates a received Bootstrap message's RP-set before it is merged
/// (§4.8's `is_consistent`): well-formed BSR address, no duplicate group
/// prefix, and fragment RP counts never exceeding the advertised total.
pub fn is_consistent(bsr_addr: IpAddr, group_prefixes: &[BsrGroupPrefix]) -> bool {
    if bsr_addr.is_multicast() || bsr_addr.is_unspecified() {
        return false;
    }

    let mut seen = std::collections::HashSet::new();
    for gp in group_prefixes {
        if !seen.insert(gp.group_prefix) {
            return false;
        }
        let sum: u32 = group_prefixes
            .iter()
            .filter(|o| o.group_prefix == gp.group_prefix)
            .map(|o| o.rps.len() as u32)
            .sum();
        if sum > gp.expected_rp_count as u32 {
            return false;
        }
    }
    true
}

/// Merges a freshly-parsed Bootstrap fragment into the active zone
/// (§4.8): same fragment tag merges the RP-set (rejecting duplicates or
/// overflow); a different tag from the preferred BSR replaces it
/// wholesale, moving superseded RPs onto the caller-supplied expire
/// list so their own Cand-RP Expiry Timers continue to govern them.
pub fn merge_fragment(
    active: &mut BsrZone,
    fragment_tag: u16,
    new_prefixes: Vec<BsrGroupPrefix>,
    expire_out: &mut Vec<BsrGroupPrefix>,
) {
    if active.fragment_tag == fragment_tag && !active.group_prefixes.is_empty() {
        for new_gp in new_prefixes {
            match active
                .group_prefixes
                .iter_mut()
                .find(|gp| gp.group_prefix == new_gp.group_prefix)
            {
                Some(existing) => {
                    for rp in new_gp.rps {
                        if !existing.rps.iter().any(|r| r.addr == rp.addr) {
                            existing.rps.push(rp);
                        }
                    }
                }
                None => active.group_prefixes.push(new_gp),
            }
        }
    } else {
        expire_out.append(&mut active.group_prefixes);
        active.group_prefixes = new_prefixes;
        active.fragment_tag = fragment_tag;
    }
}

/// `rand_override`: randomised delay a non-elected Cand-BSR waits before
/// flooding its own Bootstrap after observing a non-preferred BSM from
/// the currently elected BSR (§4.8), bounded to roughly [0, 2.5s] and
/// computed from the address/priority delta so routers further from
/// the elected BSR's priority back off longer.
pub fn rand_override(
    local_priority: u8,
    local_addr: IpAddr,
    elected_priority: u8,
    elected_addr: IpAddr,
) -> std::time::Duration {
    use std::hash::{Hash, Hasher};

    let priority_delta = elected_priority.abs_diff(local_priority) as u64;
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    local_addr.hash(&mut hasher);
    elected_addr.hash(&mut hasher);
    let jitter = hasher.finish() % 500;

    let base_ms = (priority_delta * 100).min(2000);
    std::time::Duration::from_millis(base_ms + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferred_bsr_prefers_priority_then_address() {
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();
        assert!(is_preferred(b, 220, a, 200));
        assert!(!is_preferred(a, 200, b, 220));
        assert!(is_preferred(b, 200, a, 200));
    }

    #[test]
    fn consistent_rejects_duplicate_group_prefix() {
        let gp = BsrGroupPrefix {
            group_prefix: "239.0.0.0/8".parse().unwrap(),
            expected_rp_count: 1,
            rps: vec![],
        };
        let prefixes = vec![gp.clone(), gp];
        assert!(!is_consistent("10.0.0.1".parse().unwrap(), &prefixes));
    }
}
