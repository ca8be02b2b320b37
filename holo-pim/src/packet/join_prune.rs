//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Join/Prune message (§6.1).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::DecodeError;
use crate::packet::{DecodeResult, EncodedGroup, EncodedSource, EncodedUnicast};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GroupEntry {
    pub group: EncodedGroup,
    pub joined: Vec<EncodedSource>,
    pub pruned: Vec<EncodedSource>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JoinPrune {
    pub upstream_neighbor: EncodedUnicast,
    pub holdtime: u16,
    pub groups: Vec<GroupEntry>,
}

impl JoinPrune {
    pub fn decode(buf: &mut Bytes) -> DecodeResult<JoinPrune> {
        let upstream_neighbor = EncodedUnicast::decode(buf)?;
        if buf.remaining() < 4 {
            return Err(DecodeError::Truncated("join/prune header"));
        }
        let _reserved = buf.get_u8();
        let num_groups = buf.get_u8();
        let holdtime = buf.get_u16();

        let mut groups = Vec::with_capacity(num_groups as usize);
        for _ in 0..num_groups {
            let group = EncodedGroup::decode(buf)?;
            if buf.remaining() < 4 {
                return Err(DecodeError::Truncated("group entry counts"));
            }
            let num_joined = buf.get_u16();
            let num_pruned = buf.get_u16();

            let mut joined = Vec::with_capacity(num_joined as usize);
            for _ in 0..num_joined {
                joined.push(EncodedSource::decode(buf)?);
            }
            let mut pruned = Vec::with_capacity(num_pruned as usize);
            for _ in 0..num_pruned {
                pruned.push(EncodedSource::decode(buf)?);
            }

            groups.push(GroupEntry {
                group,
                joined,
                pruned,
            });
        }

        Ok(JoinPrune {
            upstream_neighbor,
            holdtime,
            groups,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        self.upstream_neighbor.encode(buf);
        buf.put_u8(0);
        buf.put_u8(self.groups.len() as u8);
        buf.put_u16(self.holdtime);

        for entry in &self.groups {
            entry.group.encode(buf);
            buf.put_u16(entry.joined.len() as u16);
            buf.put_u16(entry.pruned.len() as u16);
            for src in &entry.joined {
                src.encode(buf);
            }
            for src in &entry.pruned {
                src.encode(buf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{GroupFlags, SourceFlags};

    #[test]
    fn round_trips_one_group_with_join_and_prune() {
        let jp = JoinPrune {
            upstream_neighbor: EncodedUnicast {
                addr: "10.0.0.1".parse().unwrap(),
            },
            holdtime: 210,
            groups: vec![GroupEntry {
                group: EncodedGroup {
                    addr: "239.1.1.1".parse().unwrap(),
                    mask_len: 32,
                    flags: GroupFlags::empty(),
                },
                joined: vec![EncodedSource {
                    addr: "192.0.2.1".parse().unwrap(),
                    mask_len: 32,
                    flags: SourceFlags::S,
                }],
                pruned: vec![],
            }],
        };

        let mut buf = BytesMut::new();
        jp.encode(&mut buf);
        let mut bytes = buf.freeze();
        let decoded = JoinPrune::decode(&mut bytes).unwrap();
        assert_eq!(decoded, jp);
    }
}
