//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Raw PIM socket I/O.

use std::net::IpAddr;
use std::os::fd::AsRawFd;

use bytes::Bytes;
use holo_utils::socket::{AsyncFd, RawSocketExt, Socket, SocketExt};
use nix::sys::socket::{self, SockaddrLike};

use crate::error::{Error, Result};

// IANA-assigned IP protocol number for PIM.
pub const PIM_IP_PROTO: i32 = 103;

pub fn all_pim_routers_v4() -> IpAddr {
    "224.0.0.13".parse().unwrap()
}

pub fn all_pim_routers_v6() -> IpAddr {
    "ff02::d".parse().unwrap()
}

/// Opens the raw IP socket used for all PIM control traffic on `ifname`
/// (§6.1), joins the All-PIM-Routers group, and returns it wrapped for
/// async readability.
pub fn socket(af: holo_utils::ip::AddressFamily, ifindex: u32) -> Result<AsyncFd<Socket>> {
    use socket2::{Domain, Protocol, Socket as Socket2, Type};

    let domain = match af {
        holo_utils::ip::AddressFamily::Ipv4 => Domain::IPV4,
        holo_utils::ip::AddressFamily::Ipv6 => Domain::IPV6,
    };
    let socket = Socket2::new(domain, Type::RAW, Some(Protocol::from(PIM_IP_PROTO)))
        .map_err(Error::Io)?;
    socket.set_nonblocking(true).map_err(Error::Io)?;

    match af {
        holo_utils::ip::AddressFamily::Ipv4 => {
            socket
                .set_multicast_ifindex_v4(ifindex)
                .map_err(Error::Io)?;
            socket
                .join_multicast_ifindex_v4(&all_pim_routers_v4_octets(), ifindex)
                .map_err(Error::Io)?;
        }
        holo_utils::ip::AddressFamily::Ipv6 => {
            socket
                .set_ipv6_checksum(2)
                .map_err(Error::Io)?;
        }
    }

    AsyncFd::new(socket).map_err(Error::Io)
}

fn all_pim_routers_v4_octets() -> [u8; 4] {
    match all_pim_routers_v4() {
        IpAddr::V4(v4) => v4.octets(),
        IpAddr::V6(_) => unreachable!(),
    }
}

/// Sends one already-encoded PIM message to `dst` on `ifindex` (§6.1:
/// unicast for Register/Register-Stop/Assert replies, multicast for
/// Hello/Join-Prune/Assert/Bootstrap).
pub async fn send(
    socket: &AsyncFd<Socket>,
    ifindex: u32,
    dst: IpAddr,
    buf: &Bytes,
) -> Result<usize> {
    loop {
        let mut guard = socket.readable().await.map_err(Error::Io)?;
        match guard.try_io(|inner| {
            let sockaddr = dst_sockaddr(ifindex, dst);
            socket::sendto(inner.get_ref().as_raw_fd(), buf, &sockaddr, socket::MsgFlags::empty())
                .map_err(|e| std::io::Error::from_raw_os_error(e as i32))
        }) {
            Ok(result) => return result.map_err(Error::Io),
            Err(_would_block) => continue,
        }
    }
}

/// Reads one datagram, returning its source address and payload.
pub async fn recv(socket: &AsyncFd<Socket>) -> Result<(IpAddr, Bytes)> {
    loop {
        let mut guard = socket.readable().await.map_err(Error::Io)?;
        let mut buf = [0u8; 65535];
        match guard.try_io(|inner| {
            socket::recvfrom::<socket::SockaddrStorage>(inner.get_ref().as_raw_fd(), &mut buf)
                .map_err(|e| std::io::Error::from_raw_os_error(e as i32))
        }) {
            Ok(Ok((len, from))) => {
                let src = from
                    .and_then(|addr| src_addr(&addr))
                    .unwrap_or(IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));
                return Ok((src, Bytes::copy_from_slice(&buf[..len])));
            }
            Ok(Err(e)) => return Err(Error::Io(e)),
            Err(_would_block) => continue,
        }
    }
}

/// Strips the IP header a raw IPv4 socket includes on every received
/// datagram. IPv6 raw sockets never include one, so `buf` is returned
/// unchanged for that family.
pub fn strip_ip_header(af: holo_utils::ip::AddressFamily, buf: Bytes) -> Bytes {
    match af {
        holo_utils::ip::AddressFamily::Ipv4 => {
            let ihl = buf.first().map(|b| (b & 0x0f) as usize * 4).unwrap_or(0);
            if ihl >= buf.len() {
                Bytes::new()
            } else {
                buf.slice(ihl..)
            }
        }
        holo_utils::ip::AddressFamily::Ipv6 => buf,
    }
}

fn dst_sockaddr(ifindex: u32, dst: IpAddr) -> socket::SockaddrStorage {
    match dst {
        IpAddr::V4(v4) => {
            socket::SockaddrStorage::from(std::net::SocketAddrV4::new(v4, 0))
        }
        IpAddr::V6(v6) => socket::SockaddrStorage::from(std::net::SocketAddrV6::new(
            v6, 0, 0, ifindex,
        )),
    }
}

fn src_addr(addr: &socket::SockaddrStorage) -> Option<IpAddr> {
    if let Some(v4) = addr.as_sockaddr_in() {
        Some(IpAddr::V4(v4.ip()))
    } else {
        addr.as_sockaddr_in6().map(|v6| IpAddr::V6(v6.ip()))
    }
}
