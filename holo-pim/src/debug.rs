//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::IpAddr;

use tracing::{debug, debug_span, trace};

// PIM debug messages.
#[derive(Debug)]
pub enum Debug<'a> {
    VifStart(&'a str),
    VifStop(&'a str),
    NbrNew(&'a str, IpAddr),
    NbrGenIdChanged(&'a str, IpAddr),
    NbrTimeout(&'a str, IpAddr),
    DrChanged(&'a str, IpAddr),
    RpChanged(IpAddr),
    AssertWinner(&'a str, IpAddr),
    AssertLoser(&'a str, IpAddr),
    BsrElected(IpAddr),
    KernelUpcall(&'a str),
}

impl Debug<'_> {
    pub(crate) fn log(&self) {
        match self {
            Debug::VifStart(ifname) | Debug::VifStop(ifname) => {
                debug_span!("vif", name = %ifname)
                    .in_scope(|| debug!("{}", self))
            }
            Debug::NbrNew(ifname, addr)
            | Debug::NbrGenIdChanged(ifname, addr)
            | Debug::NbrTimeout(ifname, addr)
            | Debug::DrChanged(ifname, addr) => {
                debug_span!("vif", name = %ifname)
                    .in_scope(|| debug!(%addr, "{}", self))
            }
            Debug::RpChanged(addr) => debug!(%addr, "{}", self),
            Debug::AssertWinner(ifname, addr)
            | Debug::AssertLoser(ifname, addr) => {
                debug_span!("vif", name = %ifname)
                    .in_scope(|| debug!(%addr, "{}", self))
            }
            Debug::BsrElected(addr) => debug!(%addr, "{}", self),
            Debug::KernelUpcall(kind) => trace!(kind, "{}", self),
        }
    }
}

impl std::fmt::Display for Debug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::VifStart(_) => write!(f, "vif started"),
            Debug::VifStop(_) => write!(f, "vif stopped"),
            Debug::NbrNew(..) => write!(f, "new neighbor"),
            Debug::NbrGenIdChanged(..) => write!(f, "neighbor GenID changed"),
            Debug::NbrTimeout(..) => write!(f, "neighbor liveness timeout"),
            Debug::DrChanged(..) => write!(f, "designated router changed"),
            Debug::RpChanged(_) => write!(f, "RP-set changed"),
            Debug::AssertWinner(..) => write!(f, "won assert"),
            Debug::AssertLoser(..) => write!(f, "lost assert"),
            Debug::BsrElected(_) => write!(f, "elected bootstrap router"),
            Debug::KernelUpcall(_) => write!(f, "kernel upcall"),
        }
    }
}
