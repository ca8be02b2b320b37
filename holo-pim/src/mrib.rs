//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Minimal MRIB (Multicast Routing Information Base) stand-in.
//!
//! The real unicast RIB this protocol consults for RPF resolution is a
//! separate collaborator and out of scope here (§1); this module models
//! just enough of its lookup surface — routes keyed by prefix, resolved
//! by longest match — for RPF computation (§4.4) to have something real
//! to query instead of a stub.

use std::net::IpAddr;

use crate::collections::VifId;

#[derive(Clone, Debug)]
struct MribRoute {
    prefix: ipnetwork::IpNetwork,
    nexthop: IpAddr,
    vif: VifId,
}

/// A table of unicast routes, queried by RPF resolution to find the
/// next hop and outgoing vif toward a source or RP address.
#[derive(Default)]
pub struct MribTable {
    routes: Vec<MribRoute>,
}

impl MribTable {
    pub fn add_route(&mut self, prefix: ipnetwork::IpNetwork, nexthop: IpAddr, vif: VifId) {
        self.routes
            .retain(|r| r.prefix != prefix || r.nexthop != nexthop);
        self.routes.push(MribRoute {
            prefix,
            nexthop,
            vif,
        });
    }

    pub fn delete_route(&mut self, prefix: &ipnetwork::IpNetwork) {
        self.routes.retain(|r| &r.prefix != prefix);
    }

    /// Longest-prefix-match lookup, returning the next hop and vif the
    /// RPF calculation should use toward `addr`.
    pub fn lookup(&self, addr: IpAddr) -> Option<(IpAddr, VifId)> {
        self.routes
            .iter()
            .filter(|r| r.prefix.is_ipv4() == addr.is_ipv4() && r.prefix.contains(addr))
            .max_by_key(|r| r.prefix.prefix())
            .map(|r| (r.nexthop, r.vif))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::Vifs;
    use crate::config::VifCfg;
    use crate::iface::Vif;

    #[test]
    fn longest_prefix_route_wins() {
        let mut vifs = Vifs::default();
        let vif_a = vifs.insert(Vif::new("eth0".to_owned(), 0, VifCfg::default()));
        let vif_b = vifs.insert(Vif::new("eth1".to_owned(), 1, VifCfg::default()));

        let mut mrib = MribTable::default();
        mrib.add_route("10.0.0.0/8".parse().unwrap(), "192.0.2.1".parse().unwrap(), vif_a);
        mrib.add_route(
            "10.1.0.0/16".parse().unwrap(),
            "192.0.2.2".parse().unwrap(),
            vif_b,
        );

        let (nexthop, vif) = mrib.lookup("10.1.2.3".parse().unwrap()).unwrap();
        assert_eq!(nexthop, "192.0.2.2".parse::<IpAddr>().unwrap());
        assert_eq!(vif, vif_b);
    }

    #[test]
    fn delete_route_removes_it() {
        let mut vifs = Vifs::default();
        let vif_a = vifs.insert(Vif::new("eth0".to_owned(), 0, VifCfg::default()));
        let mut mrib = MribTable::default();
        let prefix: ipnetwork::IpNetwork = "10.0.0.0/8".parse().unwrap();
        mrib.add_route(prefix, "192.0.2.1".parse().unwrap(), vif_a);
        mrib.delete_route(&prefix);
        assert!(mrib.lookup("10.1.2.3".parse().unwrap()).is_none());
    }
}
