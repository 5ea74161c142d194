//! Device client abstraction
//!
//! The miIO transport lives in an external SDK. This module only describes
//! what the integration needs from it: a client per host/token pair and a
//! blocking identity query with an explicit outcome.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identity reported by the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// e.g. "viomi.vacuum.v8"
    pub model: String,
    /// As reported, not normalized
    pub mac_address: String,
}

impl DeviceInfo {
    pub fn new(model: impl Into<String>, mac_address: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            mac_address: mac_address.into(),
        }
    }
}

/// Outcome of an identity query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected(DeviceInfo),
    /// The reply failed its checksum: the token does not match the device
    AuthRejected,
    /// No reply, or any other device-level error
    Unreachable(String),
}

/// A client bound to one device
pub trait ViomiDevice: Send + Sync + fmt::Debug {
    fn host(&self) -> &str;

    /// Query the device identity. Blocks on network I/O.
    fn info(&self) -> ConnectOutcome;
}

/// Creates device clients
pub trait ViomiConnector: Send + Sync {
    /// Construct a client for host/token. Does not talk to the device.
    fn connect(&self, host: &str, token: &str) -> Arc<dyn ViomiDevice>;
}

/// First five characters of a token, for log lines
pub(crate) fn token_prefix(token: &str) -> &str {
    match token.char_indices().nth(5) {
        Some((idx, _)) => &token[..idx],
        None => token,
    }
}
