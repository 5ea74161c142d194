//! Constants for the Xiaomi Viomi integration

/// Integration domain
pub const DOMAIN: &str = "xiaomi_viomi";

/// Entry schema version written by the config flow
pub const CONFIG_FLOW_VERSION: u32 = 1;

/// Entry schema version written by the YAML platform import
pub const IMPORT_VERSION: u32 = 2;

pub const CONF_HOST: &str = "host";
pub const CONF_TOKEN: &str = "token";
pub const CONF_NAME: &str = "name";
pub const CONF_MODEL: &str = "model";
pub const CONF_MAC: &str = "mac";
pub const CONF_UNIQUE_ID: &str = "unique_id";
pub const CONF_PLATFORM: &str = "platform";

/// Placeholder shown in the form's name field
pub const DEVICE_DEFAULT_NAME: &str = "Unnamed Device";

/// miIO tokens are 128-bit values written as 32 hex characters
pub const TOKEN_LENGTH: usize = 32;

/// Form error key for errors not tied to a single field
pub const ERROR_BASE: &str = "base";

pub const ERROR_CANNOT_CONNECT: &str = "cannot_connect";
pub const ERROR_INVALID_AUTH: &str = "invalid_auth";
pub const ERROR_UNKNOWN: &str = "unknown";

pub const ABORT_ALREADY_CONFIGURED: &str = "already_configured";
