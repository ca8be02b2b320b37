//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Assert message (§6.1, §4.7).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::DecodeError;
use crate::mre::AssertMetric;
use crate::packet::{DecodeResult, EncodedGroup, EncodedUnicast};

const RPT_BIT: u32 = 1 << 31;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Assert {
    pub group: EncodedGroup,
    pub source: EncodedUnicast,
    pub rpt_bit: bool,
    pub metric: AssertMetric,
}

impl Assert {
    pub fn decode(buf: &mut Bytes) -> DecodeResult<Assert> {
        let group = EncodedGroup::decode(buf)?;
        let source = EncodedUnicast::decode(buf)?;
        if buf.remaining() < 8 {
            return Err(DecodeError::Truncated("assert metric"));
        }
        let pref_word = buf.get_u32();
        let rpt_bit = pref_word & RPT_BIT != 0;
        let preference = pref_word & !RPT_BIT;
        let metric = buf.get_u32();
        Ok(Assert {
            group,
            source: source.clone(),
            rpt_bit,
            metric: AssertMetric {
                preference,
                metric,
                addr: source.addr,
            },
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        self.group.encode(buf);
        self.source.encode(buf);
        let mut pref_word = self.metric.preference & !RPT_BIT;
        if self.rpt_bit {
            pref_word |= RPT_BIT;
        }
        buf.put_u32(pref_word);
        buf.put_u32(self.metric.metric);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::GroupFlags;

    #[test]
    fn rpt_bit_round_trips_separately_from_preference() {
        let a = Assert {
            group: EncodedGroup {
                addr: "239.1.1.1".parse().unwrap(),
                mask_len: 32,
                flags: GroupFlags::empty(),
            },
            source: EncodedUnicast {
                addr: "10.0.0.9".parse().unwrap(),
            },
            rpt_bit: true,
            metric: AssertMetric {
                preference: 90,
                metric: 10,
                addr: "10.0.0.9".parse().unwrap(),
            },
        };
        let mut buf = BytesMut::new();
        a.encode(&mut buf);
        let mut bytes = buf.freeze();
        let decoded = Assert::decode(&mut bytes).unwrap();
        assert_eq!(decoded, a);
    }
}
