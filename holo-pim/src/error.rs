//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::IpAddr;

/// Errors produced while processing inbound control messages or
/// configuration changes.
#[derive(Debug)]
pub enum Error {
    /// Truncated field, bad family, bad mask length, wrong address kind,
    /// or bad checksum. The whole message is dropped.
    Malformed(String),
    /// BSM crossing a scope border, Cand-RP-Adv to a non-BSR, Register
    /// received by a non-RP.
    NotAuthorized(String),
    /// J/P, Assert, Bootstrap or Graft received from a router that never
    /// sent Hello (and the vif doesn't allow nohello neighbors).
    NeighborUnknown(IpAddr),
    /// Vif not found, MRE allocation failure, RP table overflow.
    Resource(String),
    /// Rejected at configuration commit time.
    Configuration(String),
    /// Socket / kernel-interface I/O failure.
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Malformed(msg) => write!(f, "malformed packet: {msg}"),
            Error::NotAuthorized(msg) => write!(f, "not authorized: {msg}"),
            Error::NeighborUnknown(addr) => {
                write!(f, "message from unknown neighbor {addr}")
            }
            Error::Resource(msg) => write!(f, "resource error: {msg}"),
            Error::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Error::Io(error) => write!(f, "I/O error: {error}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Error {
        Error::Io(error)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Decode-time errors, kept distinct from [`Error`] since the codec lives
/// below the neighbor/authorization layer and never sees a vif context.
#[derive(Debug, Eq, PartialEq)]
pub enum DecodeError {
    Truncated(&'static str),
    UnsupportedAddressFamily(u8),
    InvalidMaskLength(u8),
    NotUnicast,
    NotMulticast,
    BadChecksum,
    BadVersion(u8),
    UnknownMessageType(u8),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Truncated(field) => {
                write!(f, "truncated field: {field}")
            }
            DecodeError::UnsupportedAddressFamily(af) => {
                write!(f, "unsupported address family: {af}")
            }
            DecodeError::InvalidMaskLength(len) => {
                write!(f, "invalid mask length: {len}")
            }
            DecodeError::NotUnicast => write!(f, "address is not unicast"),
            DecodeError::NotMulticast => write!(f, "address is not multicast"),
            DecodeError::BadChecksum => write!(f, "checksum mismatch"),
            DecodeError::BadVersion(v) => write!(f, "unsupported PIM version {v}"),
            DecodeError::UnknownMessageType(t) => {
                write!(f, "unknown message type {t}")
            }
        }
    }
}

impl std::error::Error for DecodeError {}
