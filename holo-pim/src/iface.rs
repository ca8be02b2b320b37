//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Virtual interfaces (§3.2) and the per-vif Hello/DR machinery (§4.3).

use std::net::IpAddr;

use bitflags::bitflags;
use ipnetwork::IpNetwork;
use rand::Rng;

use crate::collections::NbrId;
use crate::config::VifCfg;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct VifFlags: u8 {
        const P2P              = 0b0000_0001;
        const LOOPBACK         = 0b0000_0010;
        const MULTICAST_CAPABLE= 0b0000_0100;
        const PIM_REGISTER     = 0b0000_1000;
        const UP               = 0b0001_0000;
    }
}

/// A virtual interface (§3.2). `vif_index` is the stable small integer
/// used as the [`crate::mre::MifSet`] bit position.
#[derive(Clone, Debug)]
pub struct Vif {
    pub name: String,
    pub vif_index: u16,
    pub flags: VifFlags,
    pub addrs: Vec<IpAddr>,
    pub primary_addr: Option<IpAddr>,
    pub domain_wide_addr: Option<IpAddr>,
    pub alternative_subnet: Vec<IpNetwork>,
    pub config: VifCfg,

    // GenID, chosen once at vif start and included in every Hello; a
    // change signals a restart to neighbors.
    pub gen_id: u32,
    pub should_send_pim_hello: bool,

    // DR election result (§4.3).
    pub dr_addr: Option<IpAddr>,

    pub neighbors: Vec<NbrId>,
}

impl Vif {
    pub fn new(name: String, vif_index: u16, config: VifCfg) -> Vif {
        let mut flags = VifFlags::empty();
        if config.is_p2p {
            flags |= VifFlags::P2P;
        }
        Vif {
            name,
            vif_index,
            flags,
            addrs: Vec::new(),
            primary_addr: None,
            domain_wide_addr: None,
            alternative_subnet: config.alternative_subnet.clone(),
            config,
            gen_id: rand::rng().random(),
            should_send_pim_hello: true,
            dr_addr: None,
            neighbors: Vec::new(),
        }
    }

    /// PIM-Register vif (§3.2): a virtual tunnel endpoint with no
    /// neighbors, used only to signal the register-encapsulation path.
    pub fn new_register(vif_index: u16) -> Vif {
        let mut vif = Vif::new(
            "pim-reg0".to_owned(),
            vif_index,
            VifCfg {
                enabled: true,
                ..VifCfg::default()
            },
        );
        vif.flags |= VifFlags::PIM_REGISTER | VifFlags::UP;
        vif
    }

    pub fn is_up(&self) -> bool {
        self.flags.contains(VifFlags::UP)
    }

    pub fn is_p2p(&self) -> bool {
        self.flags.contains(VifFlags::P2P)
    }

    pub fn is_pim_register(&self) -> bool {
        self.flags.contains(VifFlags::PIM_REGISTER)
    }

    /// True if `addr` belongs to this vif's configured or alternative
    /// subnet address space. Unnumbered/secondary links resolve as
    /// directly connected this way.
    pub fn owns_addr(&self, addr: IpAddr) -> bool {
        self.addrs.contains(&addr)
            || self.alternative_subnet.iter().any(|p| p.contains(addr))
    }

    pub fn i_am_dr(&self) -> bool {
        match (self.dr_addr, self.primary_addr) {
            (Some(dr), Some(me)) => dr == me,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_vif_has_no_neighbors_and_is_up() {
        let vif = Vif::new_register(31);
        assert!(vif.is_pim_register());
        assert!(vif.is_up());
        assert!(vif.neighbors.is_empty());
    }
}
