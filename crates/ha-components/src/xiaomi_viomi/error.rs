//! Error types for the Xiaomi Viomi integration

use ha_config_entries::ConfigEntriesError;
use std::collections::HashMap;
use thiserror::Error;

use super::consts::{ERROR_CANNOT_CONNECT, ERROR_INVALID_AUTH, ERROR_UNKNOWN};

/// Field name -> error code, as rendered on the form
pub type SchemaErrors = HashMap<String, String>;

/// Failure of the validation procedure.
///
/// Every device failure ends up as one of these; each maps to exactly one
/// form error code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FlowError {
    /// No response, or a generic device error
    #[error("cannot connect to device")]
    CannotConnect,

    /// The device rejected the token (checksum mismatch)
    #[error("device rejected the token")]
    InvalidAuth,

    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl FlowError {
    /// Error code shown on the form
    pub fn error_code(&self) -> &'static str {
        match self {
            FlowError::CannotConnect => ERROR_CANNOT_CONNECT,
            FlowError::InvalidAuth => ERROR_INVALID_AUTH,
            FlowError::Unknown(_) => ERROR_UNKNOWN,
        }
    }
}

/// Errors importing a YAML platform block
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid platform config: {0:?}")]
    Schema(SchemaErrors),

    #[error(transparent)]
    Validation(#[from] FlowError),

    #[error(transparent)]
    Entries(#[from] ConfigEntriesError),

    #[error("JSON conversion error: {0}")]
    Json(#[from] serde_json::Error),
}
