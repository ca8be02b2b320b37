//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Register and Register-Stop messages (§6.1, §4.10).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::DecodeError;
use crate::packet::{DecodeResult, EncodedGroup, EncodedUnicast};

const BORDER_BIT: u32 = 1 << 30;
const NULL_BIT: u32 = 1 << 31;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Register {
    pub border: bool,
    pub null: bool,
    pub inner_packet: Bytes,
}

impl Register {
    pub fn decode(buf: &mut Bytes) -> DecodeResult<Register> {
        if buf.remaining() < 4 {
            return Err(DecodeError::Truncated("register flags"));
        }
        let flags = buf.get_u32();
        let border = flags & BORDER_BIT != 0;
        let null = flags & NULL_BIT != 0;
        let inner_packet = buf.copy_to_bytes(buf.remaining());
        Ok(Register {
            border,
            null,
            inner_packet,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut flags = 0u32;
        if self.border {
            flags |= BORDER_BIT;
        }
        if self.null {
            flags |= NULL_BIT;
        }
        buf.put_u32(flags);
        buf.put_slice(&self.inner_packet);
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegisterStop {
    pub group: EncodedGroup,
    pub source: EncodedUnicast,
}

impl RegisterStop {
    pub fn decode(buf: &mut Bytes) -> DecodeResult<RegisterStop> {
        let group = EncodedGroup::decode(buf)?;
        let source = EncodedUnicast::decode(buf)?;
        Ok(RegisterStop { group, source })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        self.group.encode(buf);
        self.source.encode(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_flags_round_trip() {
        let reg = Register {
            border: true,
            null: false,
            inner_packet: Bytes::from_static(&[1, 2, 3, 4]),
        };
        let mut buf = BytesMut::new();
        reg.encode(&mut buf);
        let mut bytes = buf.freeze();
        let decoded = Register::decode(&mut bytes).unwrap();
        assert_eq!(decoded, reg);
    }
}
