//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Daemon-level bootstrap configuration: logging and process
//! lifecycle, loaded alongside the protocol-level [`holo_pim::config`]
//! tree (kept as two separate serde documents since one governs the
//! process and the other governs the protocol instance).

use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub user: String,
    pub logging: Logging,
    pub address_family: AddressFamily,
    pub instance: holo_pim::config::InstanceCfg,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            user: "pim".to_owned(),
            logging: Logging::default(),
            address_family: AddressFamily::Ipv4,
            instance: holo_pim::config::InstanceCfg::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    #[default]
    Ipv4,
    Ipv6,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Logging {
    pub journald: LoggingJournald,
    pub stdout: LoggingStdout,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingJournald {
    pub enabled: bool,
}

impl Default for LoggingJournald {
    fn default() -> LoggingJournald {
        LoggingJournald { enabled: true }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingStdout {
    pub enabled: bool,
}

impl Default for LoggingStdout {
    fn default() -> LoggingStdout {
        LoggingStdout { enabled: true }
    }
}

impl Config {
    pub fn load(path: Option<&str>) -> Config {
        match path {
            Some(path) if Path::new(path).exists() => {
                let data = std::fs::read_to_string(path)
                    .unwrap_or_else(|err| panic!("failed to read {path}: {err}"));
                serde_json::from_str(&data)
                    .unwrap_or_else(|err| panic!("failed to parse {path}: {err}"))
            }
            _ => Config::default(),
        }
    }
}
