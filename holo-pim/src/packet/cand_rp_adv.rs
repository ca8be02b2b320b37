//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Candidate-RP-Advertisement message (§6.1, §4.8).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::DecodeError;
use crate::packet::{DecodeResult, EncodedGroup, EncodedUnicast};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CandRpAdv {
    pub priority: u8,
    pub holdtime: u16,
    pub rp_addr: EncodedUnicast,
    // Empty means "all multicast groups" (prefix_count = 0, §6.1).
    pub group_prefixes: Vec<EncodedGroup>,
}

impl CandRpAdv {
    pub fn decode(buf: &mut Bytes) -> DecodeResult<CandRpAdv> {
        if buf.remaining() < 4 {
            return Err(DecodeError::Truncated("cand-rp-adv header"));
        }
        let prefix_count = buf.get_u8();
        let priority = buf.get_u8();
        let holdtime = buf.get_u16();
        let rp_addr = EncodedUnicast::decode(buf)?;

        let mut group_prefixes = Vec::with_capacity(prefix_count as usize);
        for _ in 0..prefix_count {
            group_prefixes.push(EncodedGroup::decode(buf)?);
        }

        Ok(CandRpAdv {
            priority,
            holdtime,
            rp_addr,
            group_prefixes,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.group_prefixes.len() as u8);
        buf.put_u8(self.priority);
        buf.put_u16(self.holdtime);
        self.rp_addr.encode(buf);
        for gp in &self.group_prefixes {
            gp.encode(buf);
        }
    }

    /// True if this advertisement (as received) claims responsibility
    /// for every multicast group (§6.1: `prefix_count == 0`).
    pub fn covers_all_groups(&self) -> bool {
        self.group_prefixes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_prefix_count_means_all_groups() {
        let adv = CandRpAdv {
            priority: 0,
            holdtime: 150,
            rp_addr: EncodedUnicast {
                addr: "10.0.0.5".parse().unwrap(),
            },
            group_prefixes: vec![],
        };
        let mut buf = BytesMut::new();
        adv.encode(&mut buf);
        let mut bytes = buf.freeze();
        let decoded = CandRpAdv::decode(&mut bytes).unwrap();
        assert!(decoded.covers_all_groups());
    }
}
