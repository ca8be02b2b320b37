//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Bootstrap message (§6.1, §4.8).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::bsr::{BsrGroupPrefix, BsrRp};
use crate::error::DecodeError;
use crate::packet::{DecodeResult, EncodedGroup, EncodedUnicast};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Bootstrap {
    pub fragment_tag: u16,
    pub hash_mask_len: u8,
    pub bsr_priority: u8,
    pub bsr_addr: EncodedUnicast,
    pub group_prefixes: Vec<BsrGroupPrefix>,
}

impl Bootstrap {
    pub fn decode(buf: &mut Bytes) -> DecodeResult<Bootstrap> {
        if buf.remaining() < 4 {
            return Err(DecodeError::Truncated("bootstrap header"));
        }
        let fragment_tag = buf.get_u16();
        let hash_mask_len = buf.get_u8();
        let bsr_priority = buf.get_u8();
        let bsr_addr = EncodedUnicast::decode(buf)?;

        let mut group_prefixes = Vec::new();
        while buf.remaining() > 0 {
            let group_prefix = EncodedGroup::decode(buf)?;
            if buf.remaining() < 4 {
                return Err(DecodeError::Truncated("bootstrap group prefix header"));
            }
            let expected_rp_count = buf.get_u8();
            let fragment_rp_count = buf.get_u8();
            let _reserved = buf.get_u16();

            let mut rps = Vec::with_capacity(fragment_rp_count as usize);
            for _ in 0..fragment_rp_count {
                let rp_addr = EncodedUnicast::decode(buf)?;
                if buf.remaining() < 4 {
                    return Err(DecodeError::Truncated("bootstrap rp entry"));
                }
                let holdtime = buf.get_u16();
                let priority = buf.get_u8();
                let _reserved = buf.get_u8();
                rps.push(BsrRp {
                    addr: rp_addr.addr,
                    priority,
                    holdtime,
                    expiry_deadline: None,
                });
            }

            group_prefixes.push(BsrGroupPrefix {
                group_prefix: ipnetwork::IpNetwork::new(
                    group_prefix.addr,
                    group_prefix.mask_len,
                )
                .map_err(|_| DecodeError::InvalidMaskLength(group_prefix.mask_len))?,
                expected_rp_count,
                rps,
            });
        }

        Ok(Bootstrap {
            fragment_tag,
            hash_mask_len,
            bsr_priority,
            bsr_addr,
            group_prefixes,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.fragment_tag);
        buf.put_u8(self.hash_mask_len);
        buf.put_u8(self.bsr_priority);
        self.bsr_addr.encode(buf);

        for gp in &self.group_prefixes {
            EncodedGroup {
                addr: gp.group_prefix.ip(),
                mask_len: gp.group_prefix.prefix(),
                flags: crate::packet::GroupFlags::empty(),
            }
            .encode(buf);
            buf.put_u8(gp.expected_rp_count);
            buf.put_u8(gp.rps.len() as u8);
            buf.put_u16(0);
            for rp in &gp.rps {
                EncodedUnicast { addr: rp.addr }.encode(buf);
                buf.put_u16(rp.holdtime);
                buf.put_u8(rp.priority);
                buf.put_u8(0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_one_group_prefix_with_two_rps() {
        let bsm = Bootstrap {
            fragment_tag: 7,
            hash_mask_len: 30,
            bsr_priority: 192,
            bsr_addr: EncodedUnicast {
                addr: "10.0.0.1".parse().unwrap(),
            },
            group_prefixes: vec![BsrGroupPrefix {
                group_prefix: "239.0.0.0/8".parse().unwrap(),
                expected_rp_count: 2,
                rps: vec![
                    BsrRp {
                        addr: "10.0.0.2".parse().unwrap(),
                        priority: 5,
                        holdtime: 150,
                        expiry_deadline: None,
                    },
                    BsrRp {
                        addr: "10.0.0.3".parse().unwrap(),
                        priority: 10,
                        holdtime: 150,
                        expiry_deadline: None,
                    },
                ],
            }],
        };

        let mut buf = BytesMut::new();
        bsm.encode(&mut buf);
        let mut bytes = buf.freeze();
        let decoded = Bootstrap::decode(&mut bytes).unwrap();
        assert_eq!(decoded, bsm);
    }
}
