//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Address-family genericity for the PIM-SM engine.
//!
//! A single daemon instance handles exactly one address family (§3.1),
//! so unlike OSPFv3 (which folds v4/v6 behind a single version enum) PIM
//! uses one concrete marker type per family, following the simpler
//! OSPFv2-style pattern.

use std::fmt::Debug;
use std::net::{Ipv4Addr, Ipv6Addr};

use ipnetwork::{Ipv4Network, Ipv6Network};

/// Trait implemented by the marker types [`Pimv4`] and [`Pimv6`],
/// parameterizing every PIM data structure over its address family.
pub trait Version: 'static + Clone + Copy + Debug + PartialEq + Eq {
    const AF: holo_utils::ip::AddressFamily;

    type IpAddr: PimAddr;
    type IpNetwork: PimNetwork<Self::IpAddr>;

    /// The all-PIM-routers multicast address for this family.
    fn all_pim_routers() -> Self::IpAddr;
}

/// Minimal address operations the PIM engine needs, independent of
/// family (mirrors `holo_utils::ip::IpAddrKind` but scoped to what the
/// MRT/MRE code actually calls).
pub trait PimAddr:
    Copy + Clone + Debug + Default + Eq + Ord + std::hash::Hash + Send + Sync
{
    fn is_unicast(&self) -> bool;
    fn is_multicast(&self) -> bool;
    fn is_linklocal_multicast(&self) -> bool;
    fn is_nodelocal_multicast(&self) -> bool;
    fn octets(&self) -> Vec<u8>;
}

pub trait PimNetwork<A>: Copy + Clone + Debug + Eq + Send + Sync {
    fn addr(&self) -> A;
    fn prefix_len(&self) -> u8;
}

impl PimAddr for Ipv4Addr {
    fn is_unicast(&self) -> bool {
        !self.is_multicast() && !self.is_broadcast() && !self.is_unspecified()
    }

    fn is_multicast(&self) -> bool {
        Ipv4Addr::is_multicast(self)
    }

    fn is_linklocal_multicast(&self) -> bool {
        self.octets()[0] == 224 && self.octets()[1] == 0 && self.octets()[2] == 0
    }

    fn is_nodelocal_multicast(&self) -> bool {
        *self == Ipv4Addr::new(224, 0, 0, 0)
    }

    fn octets(&self) -> Vec<u8> {
        Ipv4Addr::octets(self).to_vec()
    }
}

impl PimAddr for Ipv6Addr {
    fn is_unicast(&self) -> bool {
        !self.is_multicast() && !self.is_unspecified()
    }

    fn is_multicast(&self) -> bool {
        Ipv6Addr::is_multicast(self)
    }

    fn is_linklocal_multicast(&self) -> bool {
        self.is_multicast() && (self.segments()[0] & 0x000f) == 0x0002
    }

    fn is_nodelocal_multicast(&self) -> bool {
        self.is_multicast() && (self.segments()[0] & 0x000f) == 0x0001
    }

    fn octets(&self) -> Vec<u8> {
        Ipv6Addr::octets(self).to_vec()
    }
}

impl PimNetwork<Ipv4Addr> for Ipv4Network {
    fn addr(&self) -> Ipv4Addr {
        self.ip()
    }

    fn prefix_len(&self) -> u8 {
        self.prefix()
    }
}

impl PimNetwork<Ipv6Addr> for Ipv6Network {
    fn addr(&self) -> Ipv6Addr {
        self.ip()
    }

    fn prefix_len(&self) -> u8 {
        self.prefix()
    }
}

/// PIM-SMv2 over IPv4.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Pimv4;

/// PIM-SMv2 over IPv6.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Pimv6;

impl Version for Pimv4 {
    const AF: holo_utils::ip::AddressFamily = holo_utils::ip::AddressFamily::Ipv4;

    type IpAddr = Ipv4Addr;
    type IpNetwork = Ipv4Network;

    fn all_pim_routers() -> Ipv4Addr {
        Ipv4Addr::new(224, 0, 0, 13)
    }
}

impl Version for Pimv6 {
    const AF: holo_utils::ip::AddressFamily = holo_utils::ip::AddressFamily::Ipv6;

    type IpAddr = Ipv6Addr;
    type IpNetwork = Ipv6Network;

    fn all_pim_routers() -> Ipv6Addr {
        "ff02::d".parse().unwrap()
    }
}
