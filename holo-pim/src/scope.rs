//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Scope-Zone Table (§4.2).

use std::net::IpAddr;

use ipnetwork::IpNetwork;

use crate::mre::MifSet;

#[derive(Clone, Debug)]
pub struct ScopeZone {
    pub prefix: IpNetwork,
    pub scoped_vifs: MifSet,
}

#[derive(Default)]
pub struct ScopeZoneTable {
    zones: Vec<ScopeZone>,
}

impl ScopeZoneTable {
    pub fn insert(&mut self, zone: ScopeZone) {
        self.zones.push(zone);
    }

    pub fn clear(&mut self) {
        self.zones.clear();
    }

    /// `is_scoped(addr, vif_index)`: true iff some zone's prefix
    /// contains `addr` AND that zone is a boundary on `vif_index`.
    pub fn is_scoped(&self, addr: IpAddr, vif_index: u16) -> bool {
        self.zones
            .iter()
            .any(|z| z.prefix.contains(addr) && z.scoped_vifs.test(vif_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_boundary_blocks_one_vif_not_others() {
        let mut table = ScopeZoneTable::default();
        let mut scoped = MifSet::new();
        scoped.set(1);
        table.insert(ScopeZone {
            prefix: "239.0.0.0/8".parse().unwrap(),
            scoped_vifs: scoped,
        });

        let addr: IpAddr = "239.1.1.1".parse().unwrap();
        assert!(table.is_scoped(addr, 1));
        assert!(!table.is_scoped(addr, 2));
    }
}
