//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Per-vif neighbor table (§3.3, §4.3).

use std::net::IpAddr;
use std::time::{Duration, Instant};

/// Hello options as received from a neighbor (§6.1).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct HelloOptions {
    pub holdtime: Option<u16>,
    pub lan_prune_delay_ms: Option<u32>,
    pub override_interval_ms: Option<u32>,
    pub is_tracking_support_enabled: bool,
    pub dr_priority: Option<u32>,
    pub gen_id: Option<u32>,
}

/// A neighboring PIM router discovered via Hello on some vif (§3.3).
#[derive(Clone, Debug)]
pub struct PimNbr {
    pub addr: IpAddr,
    pub proto_version: u8,
    pub options: HelloOptions,
    pub liveness_deadline: Option<Instant>,
    // Transient neighbors synthesized for `accept_nohello_neighbors`
    // carry no liveness timer and are refreshed rather than re-created.
    pub is_transient: bool,
}

impl PimNbr {
    pub fn new(addr: IpAddr, proto_version: u8) -> PimNbr {
        PimNbr {
            addr,
            proto_version,
            options: HelloOptions::default(),
            liveness_deadline: None,
            is_transient: false,
        }
    }

    pub fn transient(addr: IpAddr, proto_version: u8) -> PimNbr {
        PimNbr {
            is_transient: true,
            ..PimNbr::new(addr, proto_version)
        }
    }

    pub fn dr_priority(&self) -> Option<u32> {
        self.options.dr_priority
    }

    pub fn rearm_liveness(&mut self, holdtime: u16) {
        if holdtime == 0 {
            // Holdtime 0 signals graceful shutdown (§6.5, P6): expire now.
            self.liveness_deadline = Some(Instant::now());
        } else {
            self.liveness_deadline =
                Some(Instant::now() + Duration::from_secs(holdtime as u64));
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.liveness_deadline, Some(deadline) if deadline <= now)
    }
}

/// Sentinel representing the local router itself in DR elections (§3.3).
pub fn pim_nbr_me_addr() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
}

/// DR election candidate, either a real neighbor or the local router.
#[derive(Clone, Copy, Debug)]
pub struct DrCandidate {
    pub addr: IpAddr,
    pub priority: Option<u32>,
}

/// Elects the designated router on a vif: highest DR-priority wins,
/// ignoring priority entirely if any candidate omitted the option,
/// tiebreak by largest address (§4.3).
pub fn dr_election(candidates: &[DrCandidate]) -> Option<IpAddr> {
    if candidates.is_empty() {
        return None;
    }
    let any_missing_priority = candidates.iter().any(|c| c.priority.is_none());
    let winner = candidates.iter().max_by(|a, b| {
        if any_missing_priority {
            a.addr.cmp(&b.addr)
        } else {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.addr.cmp(&b.addr))
        }
    });
    winner.map(|c| c.addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dr_election_prefers_priority() {
        let candidates = vec![
            DrCandidate {
                addr: "10.0.0.1".parse().unwrap(),
                priority: Some(1),
            },
            DrCandidate {
                addr: "10.0.0.2".parse().unwrap(),
                priority: Some(5),
            },
        ];
        assert_eq!(
            dr_election(&candidates),
            Some("10.0.0.2".parse().unwrap())
        );
    }

    #[test]
    fn dr_election_ignores_priority_when_any_missing() {
        let candidates = vec![
            DrCandidate {
                addr: "10.0.0.1".parse().unwrap(),
                priority: Some(200),
            },
            DrCandidate {
                addr: "10.0.0.9".parse().unwrap(),
                priority: None,
            },
        ];
        assert_eq!(
            dr_election(&candidates),
            Some("10.0.0.9".parse().unwrap())
        );
    }

    #[test]
    fn dr_election_tiebreak_by_address() {
        let candidates = vec![
            DrCandidate {
                addr: "10.0.0.1".parse().unwrap(),
                priority: Some(5),
            },
            DrCandidate {
                addr: "10.0.0.9".parse().unwrap(),
                priority: Some(5),
            },
        ];
        assert_eq!(
            dr_election(&candidates),
            Some("10.0.0.9".parse().unwrap())
        );
    }
}
