//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Configuration surface (§6.4). Loaded as plain serde structures rather
//! than through the northbound/YANG pipeline used by the rest of this
//! workspace's protocol daemons, since this daemon runs standalone
//! instead of under the multi-protocol supervisor's dynamic instance
//! registry.

use std::collections::BTreeMap;
use std::net::IpAddr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

/// Default constants, §6.5.
pub mod defaults {
    pub const HELLO_PERIOD: u16 = 30;
    pub const HELLO_HOLDTIME: u16 = 105;
    pub const HELLO_TRIGGERED_DELAY: u16 = 5;
    pub const JOIN_PRUNE_PERIOD: u16 = 60;
    pub const JOIN_PRUNE_HOLDTIME: u16 = 210;
    pub const ASSERT_TIME: u16 = 180;
    pub const ASSERT_OVERRIDE_INTERVAL: u16 = 3;
    pub const KEEPALIVE_PERIOD: u16 = 210;
    pub const REGISTER_SUPPRESSION_TIMEOUT: u16 = 60;
    pub const REGISTER_PROBE_TIME: u16 = 5;
    // max(KEEPALIVE_PERIOD, 3 * REGISTER_SUPPRESSION_TIMEOUT + REGISTER_PROBE_TIME)
    // ~= 210s, per §6.5.
    const RP_KEEPALIVE_FLOOR: u16 =
        3 * REGISTER_SUPPRESSION_TIMEOUT + REGISTER_PROBE_TIME;
    pub const RP_KEEPALIVE_PERIOD: u16 = if RP_KEEPALIVE_FLOOR > KEEPALIVE_PERIOD {
        RP_KEEPALIVE_FLOOR
    } else {
        KEEPALIVE_PERIOD
    };
    pub const BSR_BOOTSTRAP_PERIOD: u16 = 60;
    pub const BSR_BOOTSTRAP_TIMEOUT: u16 = 130;
    pub const BSR_SCOPE_ZONE_TIMEOUT: u16 = 1300;
    pub const CAND_RP_ADV_PERIOD: u16 = 60;
    pub const DR_PRIORITY: u32 = 1;
    pub const LOWEST_BSR_PRIORITY: u8 = 0;
    pub const OVERRIDE_INTERVAL_MS: u32 = 2500;
    pub const JOIN_PRUNE_OVERRIDE_INTERVAL_MS: u32 = 2500;
}

/// Top-level per-instance configuration.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InstanceCfg {
    pub vifs: BTreeMap<String, VifCfg>,
    pub switch_to_spt: SwitchToSptCfg,
    pub bsr_zones: Vec<BsrZoneCfg>,
    pub static_rps: Vec<StaticRpCfg>,
    pub scope_zones: Vec<ScopeZoneCfg>,
}

/// Per-vif configuration (§6.4).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct VifCfg {
    pub proto_version: u8,
    pub hello_triggered_delay: u16,
    pub hello_period: u16,
    pub hello_holdtime: u16,
    pub dr_priority: u32,
    pub propagation_delay_ms: u32,
    pub override_interval_ms: u32,
    pub is_tracking_support_disabled: bool,
    pub accept_nohello_neighbors: bool,
    pub join_prune_period: u16,
    pub alternative_subnet: Vec<IpNetwork>,
    pub is_p2p: bool,
    pub enabled: bool,
}

impl Default for VifCfg {
    fn default() -> VifCfg {
        VifCfg {
            proto_version: 2,
            hello_triggered_delay: defaults::HELLO_TRIGGERED_DELAY,
            hello_period: defaults::HELLO_PERIOD,
            hello_holdtime: defaults::HELLO_HOLDTIME,
            dr_priority: defaults::DR_PRIORITY,
            propagation_delay_ms: 500,
            override_interval_ms: defaults::OVERRIDE_INTERVAL_MS,
            is_tracking_support_disabled: false,
            accept_nohello_neighbors: false,
            join_prune_period: defaults::JOIN_PRUNE_PERIOD,
            alternative_subnet: Vec::new(),
            is_p2p: false,
            enabled: true,
        }
    }
}

/// Global SPT-switch policy.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SwitchToSptCfg {
    pub enabled: bool,
    pub interval_sec: u32,
    pub bytes: u64,
}

impl Default for SwitchToSptCfg {
    fn default() -> SwitchToSptCfg {
        SwitchToSptCfg {
            enabled: false,
            interval_sec: 60,
            bytes: 0,
        }
    }
}

/// Candidate-BSR/Candidate-RP configuration for one zone.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BsrZoneCfg {
    pub scope_zone_prefix: Option<IpNetwork>,
    pub cand_bsr: Option<CandBsrCfg>,
    pub cand_rps: Vec<CandRpCfg>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CandBsrCfg {
    pub vif: String,
    pub addr: IpAddr,
    pub priority: u8,
    pub hash_mask_len: u8,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CandRpCfg {
    pub vif: String,
    pub addr: IpAddr,
    pub priority: u8,
    pub holdtime: u16,
    pub group_prefix: IpNetwork,
}

/// Static RP entry (§6.4).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StaticRpCfg {
    pub group_prefix: IpNetwork,
    pub rp_addr: IpAddr,
    pub priority: u8,
    pub hash_mask_len: u8,
}

/// Administrative scope boundary (§6.4, §4.2).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ScopeZoneCfg {
    pub scope_zone_prefix: IpNetwork,
    pub vifs: Vec<String>,
}
