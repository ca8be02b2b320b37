//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Hello message (§6.1): a sequence of `{type(16), length(16), value}`
//! TLVs.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::DecodeError;
use crate::neighbor::HelloOptions;
use crate::packet::DecodeResult;

const OPT_HOLDTIME: u16 = 1;
const OPT_LAN_PRUNE_DELAY: u16 = 2;
const OPT_DR_PRIORITY: u16 = 19;
const OPT_GENID: u16 = 20;

pub fn decode(buf: &mut Bytes) -> DecodeResult<HelloOptions> {
    let mut options = HelloOptions::default();

    while buf.remaining() >= 4 {
        let opt_type = buf.get_u16();
        let opt_len = buf.get_u16() as usize;
        if buf.remaining() < opt_len {
            return Err(DecodeError::Truncated("hello option"));
        }
        let mut value = buf.copy_to_bytes(opt_len);

        match opt_type {
            OPT_HOLDTIME if opt_len == 2 => {
                options.holdtime = Some(value.get_u16());
            }
            OPT_LAN_PRUNE_DELAY if opt_len == 4 => {
                let word = value.get_u32();
                options.is_tracking_support_enabled = word & 0x8000_0000 != 0;
                options.lan_prune_delay_ms = Some((word >> 16) as u32 & 0x7fff);
                options.override_interval_ms = Some(word & 0xffff);
            }
            OPT_DR_PRIORITY if opt_len == 4 => {
                options.dr_priority = Some(value.get_u32());
            }
            OPT_GENID if opt_len == 4 => {
                options.gen_id = Some(value.get_u32());
            }
            // Unknown options are skipped but counted (§6.1); the
            // caller can observe this via tracing if it cares.
            _ => {
                tracing::trace!(opt_type, opt_len, "skipping unrecognized hello option");
            }
        }
    }

    Ok(options)
}

pub fn encode(buf: &mut BytesMut, gen_id: u32, holdtime: u16, dr_priority: u32) {
    buf.put_u16(OPT_HOLDTIME);
    buf.put_u16(2);
    buf.put_u16(holdtime);

    buf.put_u16(OPT_DR_PRIORITY);
    buf.put_u16(4);
    buf.put_u32(dr_priority);

    buf.put_u16(OPT_GENID);
    buf.put_u16(4);
    buf.put_u32(gen_id);
}

/// Encodes a full option set from a [`HelloOptions`], for the generic
/// `Message::encode` dispatch path. Options left `None` are omitted.
pub fn encode_options(buf: &mut BytesMut, options: &HelloOptions) {
    if let Some(holdtime) = options.holdtime {
        buf.put_u16(OPT_HOLDTIME);
        buf.put_u16(2);
        buf.put_u16(holdtime);
    }
    if let (Some(propagation_delay_ms), Some(override_interval_ms)) =
        (options.lan_prune_delay_ms, options.override_interval_ms)
    {
        encode_lan_prune_delay(
            buf,
            options.is_tracking_support_enabled,
            propagation_delay_ms,
            override_interval_ms,
        );
    }
    if let Some(dr_priority) = options.dr_priority {
        buf.put_u16(OPT_DR_PRIORITY);
        buf.put_u16(4);
        buf.put_u32(dr_priority);
    }
    if let Some(gen_id) = options.gen_id {
        buf.put_u16(OPT_GENID);
        buf.put_u16(4);
        buf.put_u32(gen_id);
    }
}

pub fn encode_lan_prune_delay(
    buf: &mut BytesMut,
    tracking_support: bool,
    propagation_delay_ms: u32,
    override_interval_ms: u32,
) {
    buf.put_u16(OPT_LAN_PRUNE_DELAY);
    buf.put_u16(4);
    let mut word = (propagation_delay_ms & 0x7fff) << 16 | (override_interval_ms & 0xffff);
    if tracking_support {
        word |= 0x8000_0000;
    }
    buf.put_u32(word);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_option_is_skipped_not_fatal() {
        let mut buf = BytesMut::new();
        buf.put_u16(0xfff0);
        buf.put_u16(2);
        buf.put_u16(0xaaaa);
        buf.put_u16(OPT_GENID);
        buf.put_u16(4);
        buf.put_u32(42);

        let mut bytes = buf.freeze();
        let options = decode(&mut bytes).unwrap();
        assert_eq!(options.gen_id, Some(42));
    }

    #[test]
    fn holdtime_and_dr_priority_round_trip() {
        let mut buf = BytesMut::new();
        encode(&mut buf, 7, 105, 5);
        let mut bytes = buf.freeze();
        let options = decode(&mut bytes).unwrap();
        assert_eq!(options.holdtime, Some(105));
        assert_eq!(options.dr_priority, Some(5));
        assert_eq!(options.gen_id, Some(7));
    }
}
