//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! PIM control-message codec (§6.1).

pub mod assert;
pub mod bootstrap;
pub mod cand_rp_adv;
pub mod hello;
pub mod join_prune;
pub mod register;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use internet_checksum::Checksum;

use crate::error::DecodeError;

pub type DecodeResult<T> = Result<T, DecodeError>;

const AF_IPV4: u8 = 1;
const AF_IPV6: u8 = 2;
const NATIVE_ENCODING: u8 = 0;

pub const PIM_HDR_LEN: usize = 4;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum MessageType {
    Hello = 0,
    Register = 1,
    RegisterStop = 2,
    JoinPrune = 3,
    Bootstrap = 4,
    Assert = 5,
    Graft = 6,
    GraftAck = 7,
    CandRpAdv = 8,
}

impl MessageType {
    pub fn from_u8(v: u8) -> DecodeResult<MessageType> {
        Ok(match v {
            0 => MessageType::Hello,
            1 => MessageType::Register,
            2 => MessageType::RegisterStop,
            3 => MessageType::JoinPrune,
            4 => MessageType::Bootstrap,
            5 => MessageType::Assert,
            6 => MessageType::Graft,
            7 => MessageType::GraftAck,
            8 => MessageType::CandRpAdv,
            other => return Err(DecodeError::UnknownMessageType(other)),
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PimHdr {
    pub version: u8,
    pub msg_type: MessageType,
}

impl PimHdr {
    pub fn decode(buf: &mut Bytes) -> DecodeResult<PimHdr> {
        if buf.remaining() < PIM_HDR_LEN {
            return Err(DecodeError::Truncated("pim header"));
        }
        let vt = buf.get_u8();
        let version = vt >> 4;
        if version != 2 {
            return Err(DecodeError::BadVersion(version));
        }
        let msg_type = MessageType::from_u8(vt & 0x0f)?;
        let _reserved = buf.get_u8();
        let _checksum = buf.get_u16();
        Ok(PimHdr { version, msg_type })
    }

    pub fn encode(buf: &mut BytesMut, msg_type: MessageType) {
        buf.put_u8((2 << 4) | (msg_type as u8));
        buf.put_u8(0);
        buf.put_u16(0);
    }
}

/// Computes and writes the Internet checksum for the whole message into
/// the header's checksum field (bytes 2-3), optionally over an IPv6
/// pseudo-header first (§6.1). `register_body_only` covers only the
/// first 8 octets, per the Register message's special rule.
pub fn finalize_checksum(
    buf: &mut [u8],
    pseudo_header: Option<&[u8]>,
    register_body_only: bool,
) {
    let mut cksum = Checksum::new();
    if let Some(ph) = pseudo_header {
        cksum.add_bytes(ph);
    }
    let covered = if register_body_only {
        &buf[..8.min(buf.len())]
    } else {
        &buf[..]
    };
    cksum.add_bytes(covered);
    let result = cksum.checksum();
    buf[2] = result[0];
    buf[3] = result[1];
}

pub fn verify_checksum(
    buf: &[u8],
    pseudo_header: Option<&[u8]>,
    register_body_only: bool,
) -> bool {
    let mut cksum = Checksum::new();
    if let Some(ph) = pseudo_header {
        cksum.add_bytes(ph);
    }
    let covered = if register_body_only {
        &buf[..8.min(buf.len())]
    } else {
        buf
    };
    cksum.add_bytes(covered);
    cksum.checksum() == [0, 0]
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct GroupFlags: u8 {
        const Z = 0b0000_0001;
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct SourceFlags: u8 {
        const S = 0b0000_0100;
        const W = 0b0000_0010;
        const R = 0b0000_0001;
    }
}

fn addr_family(addr: IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => AF_IPV4,
        IpAddr::V6(_) => AF_IPV6,
    }
}

fn addr_len(family: u8) -> usize {
    match family {
        AF_IPV4 => 4,
        AF_IPV6 => 16,
        _ => 0,
    }
}

fn get_addr(buf: &mut Bytes, family: u8) -> DecodeResult<IpAddr> {
    let len = addr_len(family);
    if len == 0 {
        return Err(DecodeError::UnsupportedAddressFamily(family));
    }
    if buf.remaining() < len {
        return Err(DecodeError::Truncated("address"));
    }
    Ok(match family {
        AF_IPV4 => {
            let mut octets = [0u8; 4];
            buf.copy_to_slice(&mut octets);
            IpAddr::V4(Ipv4Addr::from(octets))
        }
        AF_IPV6 => {
            let mut octets = [0u8; 16];
            buf.copy_to_slice(&mut octets);
            IpAddr::V6(Ipv6Addr::from(octets))
        }
        _ => unreachable!(),
    })
}

fn put_addr(buf: &mut BytesMut, addr: IpAddr) {
    match addr {
        IpAddr::V4(v4) => buf.put_slice(&v4.octets()),
        IpAddr::V6(v6) => buf.put_slice(&v6.octets()),
    }
}

/// Encoded-Unicast Address: `family(8) | encoding(8) | addr`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EncodedUnicast {
    pub addr: IpAddr,
}

impl EncodedUnicast {
    pub fn decode(buf: &mut Bytes) -> DecodeResult<EncodedUnicast> {
        if buf.remaining() < 2 {
            return Err(DecodeError::Truncated("encoded-unicast"));
        }
        let family = buf.get_u8();
        let _encoding = buf.get_u8();
        let addr = get_addr(buf, family)?;
        if addr.is_multicast() {
            return Err(DecodeError::NotUnicast);
        }
        Ok(EncodedUnicast { addr })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(addr_family(self.addr));
        buf.put_u8(NATIVE_ENCODING);
        put_addr(buf, self.addr);
    }
}

/// Encoded-Group Address: `family | encoding | reserved-flags(8) |
/// mask_len(8) | addr`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EncodedGroup {
    pub addr: IpAddr,
    pub mask_len: u8,
    pub flags: GroupFlags,
}

impl EncodedGroup {
    pub fn decode(buf: &mut Bytes) -> DecodeResult<EncodedGroup> {
        if buf.remaining() < 4 {
            return Err(DecodeError::Truncated("encoded-group"));
        }
        let family = buf.get_u8();
        let _encoding = buf.get_u8();
        let flags = GroupFlags::from_bits_truncate(buf.get_u8());
        let mask_len = buf.get_u8();
        let max_len = (addr_len(family) * 8) as u8;
        if mask_len > max_len {
            return Err(DecodeError::InvalidMaskLength(mask_len));
        }
        let addr = get_addr(buf, family)?;
        if !addr.is_multicast() {
            return Err(DecodeError::NotMulticast);
        }
        Ok(EncodedGroup {
            addr,
            mask_len,
            flags,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(addr_family(self.addr));
        buf.put_u8(NATIVE_ENCODING);
        buf.put_u8(self.flags.bits());
        buf.put_u8(self.mask_len);
        put_addr(buf, self.addr);
    }
}

/// Encoded-Source Address: `family | encoding | S/W/R flags(8) |
/// mask_len(8) | addr`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EncodedSource {
    pub addr: IpAddr,
    pub mask_len: u8,
    pub flags: SourceFlags,
}

impl EncodedSource {
    pub fn decode(buf: &mut Bytes) -> DecodeResult<EncodedSource> {
        if buf.remaining() < 4 {
            return Err(DecodeError::Truncated("encoded-source"));
        }
        let family = buf.get_u8();
        let _encoding = buf.get_u8();
        let flags = SourceFlags::from_bits_truncate(buf.get_u8());
        let mask_len = buf.get_u8();
        let max_len = (addr_len(family) * 8) as u8;
        if mask_len > max_len {
            return Err(DecodeError::InvalidMaskLength(mask_len));
        }
        let addr = get_addr(buf, family)?;
        if addr.is_multicast() {
            return Err(DecodeError::NotUnicast);
        }
        Ok(EncodedSource {
            addr,
            mask_len,
            flags,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(addr_family(self.addr));
        buf.put_u8(NATIVE_ENCODING);
        buf.put_u8(self.flags.bits());
        buf.put_u8(self.mask_len);
        put_addr(buf, self.addr);
    }
}

/// A fully decoded PIM control message, header stripped (§6.1).
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    Hello(crate::neighbor::HelloOptions),
    Register(register::Register),
    RegisterStop(register::RegisterStop),
    JoinPrune(join_prune::JoinPrune),
    Bootstrap(bootstrap::Bootstrap),
    Assert(assert::Assert),
    CandRpAdv(cand_rp_adv::CandRpAdv),
}

impl Message {
    pub fn msg_type(&self) -> MessageType {
        match self {
            Message::Hello(_) => MessageType::Hello,
            Message::Register(_) => MessageType::Register,
            Message::RegisterStop(_) => MessageType::RegisterStop,
            Message::JoinPrune(_) => MessageType::JoinPrune,
            Message::Bootstrap(_) => MessageType::Bootstrap,
            Message::Assert(_) => MessageType::Assert,
            Message::CandRpAdv(_) => MessageType::CandRpAdv,
        }
    }

    /// Decodes a whole message including the 4-byte header and checksum
    /// verification. `pseudo_header` must be supplied for IPv6 (§6.1).
    pub fn decode(data: &[u8], pseudo_header: Option<&[u8]>) -> DecodeResult<Message> {
        let hdr = PimHdr::decode(&mut Bytes::copy_from_slice(&data[..PIM_HDR_LEN.min(data.len())]))?;
        let register_body_only = hdr.msg_type == MessageType::Register;
        if !verify_checksum(data, pseudo_header, register_body_only) {
            return Err(DecodeError::BadChecksum);
        }

        let mut body = Bytes::copy_from_slice(&data[PIM_HDR_LEN..]);
        Ok(match hdr.msg_type {
            MessageType::Hello => Message::Hello(hello::decode(&mut body)?),
            MessageType::Register => Message::Register(register::Register::decode(&mut body)?),
            MessageType::RegisterStop => {
                Message::RegisterStop(register::RegisterStop::decode(&mut body)?)
            }
            MessageType::JoinPrune => {
                Message::JoinPrune(join_prune::JoinPrune::decode(&mut body)?)
            }
            MessageType::Bootstrap => {
                Message::Bootstrap(bootstrap::Bootstrap::decode(&mut body)?)
            }
            MessageType::Assert => Message::Assert(assert::Assert::decode(&mut body)?),
            MessageType::CandRpAdv => {
                Message::CandRpAdv(cand_rp_adv::CandRpAdv::decode(&mut body)?)
            }
            MessageType::Graft | MessageType::GraftAck => {
                return Err(DecodeError::UnknownMessageType(hdr.msg_type as u8));
            }
        })
    }

    /// Encodes the full wire message including header and checksum.
    /// `pseudo_header` must be supplied for IPv6 (§6.1); this is always
    /// `None` here since no v6 pseudo-header is computed (§13).
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        PimHdr::encode(&mut buf, self.msg_type());

        match self {
            Message::Hello(options) => hello::encode_options(&mut buf, options),
            Message::Register(reg) => reg.encode(&mut buf),
            Message::RegisterStop(stop) => stop.encode(&mut buf),
            Message::JoinPrune(jp) => jp.encode(&mut buf),
            Message::Bootstrap(bsm) => bsm.encode(&mut buf),
            Message::Assert(a) => a.encode(&mut buf),
            Message::CandRpAdv(adv) => adv.encode(&mut buf),
        }

        let register_body_only = self.msg_type() == MessageType::Register;
        finalize_checksum(&mut buf, None, register_body_only);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_unicast_round_trips_v4() {
        let addr: IpAddr = "192.0.2.1".parse().unwrap();
        let eu = EncodedUnicast { addr };
        let mut buf = BytesMut::new();
        eu.encode(&mut buf);
        let mut bytes = buf.freeze();
        let decoded = EncodedUnicast::decode(&mut bytes).unwrap();
        assert_eq!(decoded.addr, addr);
    }

    #[test]
    fn encoded_group_rejects_unicast_address() {
        let mut buf = BytesMut::new();
        buf.put_u8(AF_IPV4);
        buf.put_u8(0);
        buf.put_u8(0);
        buf.put_u8(24);
        buf.put_slice(&Ipv4Addr::new(10, 0, 0, 0).octets());
        let mut bytes = buf.freeze();
        assert!(matches!(
            EncodedGroup::decode(&mut bytes),
            Err(DecodeError::NotMulticast)
        ));
    }

    #[test]
    fn header_decode_rejects_bad_version() {
        let mut buf = BytesMut::new();
        buf.put_u8(1 << 4);
        buf.put_u8(0);
        buf.put_u16(0);
        let mut bytes = buf.freeze();
        assert!(matches!(
            PimHdr::decode(&mut bytes),
            Err(DecodeError::BadVersion(1))
        ));
    }
}
