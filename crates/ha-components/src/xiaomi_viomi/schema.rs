//! Device config form schema
//!
//! Input is checked here before any connection attempt is made.

use ha_config_entries::FormField;
use serde_json::{json, Value};

use super::consts::{
    CONF_HOST, CONF_NAME, CONF_PLATFORM, CONF_TOKEN, DEVICE_DEFAULT_NAME, ERROR_BASE, TOKEN_LENGTH,
};
use super::error::SchemaErrors;

pub const ERROR_REQUIRED: &str = "required";
pub const ERROR_INVALID_TYPE: &str = "invalid_type";
pub const ERROR_INVALID_LENGTH: &str = "invalid_length";
pub const ERROR_NOT_ALLOWED: &str = "not_allowed";

/// Connection parameters entered by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfigInput {
    pub host: String,
    /// Exactly [`TOKEN_LENGTH`] characters
    pub token: String,
    /// None when omitted or left empty
    pub name: Option<String>,
    /// Only present on YAML platform blocks
    pub platform: Option<String>,
}

/// Fields of the `user` step form
pub fn device_config_schema() -> Vec<FormField> {
    vec![
        FormField {
            name: CONF_HOST.to_string(),
            field_type: "string".to_string(),
            required: Some(true),
            default: None,
            length: None,
        },
        FormField {
            name: CONF_TOKEN.to_string(),
            field_type: "string".to_string(),
            required: Some(true),
            default: None,
            length: Some(TOKEN_LENGTH),
        },
        FormField {
            name: CONF_NAME.to_string(),
            field_type: "string".to_string(),
            required: Some(false),
            default: Some(json!(DEVICE_DEFAULT_NAME)),
            length: None,
        },
    ]
}

/// Validate form input
pub fn validate_user_input(raw: &Value) -> Result<DeviceConfigInput, SchemaErrors> {
    validate(raw, false)
}

/// Validate a YAML platform block, which also carries `platform`
pub fn validate_platform_config(raw: &Value) -> Result<DeviceConfigInput, SchemaErrors> {
    validate(raw, true)
}

fn validate(raw: &Value, allow_platform: bool) -> Result<DeviceConfigInput, SchemaErrors> {
    let mut errors = SchemaErrors::new();

    let Some(fields) = raw.as_object() else {
        errors.insert(ERROR_BASE.to_string(), ERROR_INVALID_TYPE.to_string());
        return Err(errors);
    };

    for key in fields.keys() {
        let known = matches!(key.as_str(), CONF_HOST | CONF_TOKEN | CONF_NAME)
            || (allow_platform && key == CONF_PLATFORM);
        if !known {
            errors.insert(key.clone(), ERROR_NOT_ALLOWED.to_string());
        }
    }

    let host = required_str(raw, CONF_HOST, &mut errors);

    let token = required_str(raw, CONF_TOKEN, &mut errors);
    if let Some(token) = token {
        if token.chars().count() != TOKEN_LENGTH {
            errors.insert(CONF_TOKEN.to_string(), ERROR_INVALID_LENGTH.to_string());
        }
    }

    let name = optional_str(raw, CONF_NAME, &mut errors).filter(|name| !name.is_empty());
    let platform = if allow_platform {
        optional_str(raw, CONF_PLATFORM, &mut errors)
    } else {
        None
    };

    match (host, token) {
        (Some(host), Some(token)) if errors.is_empty() => Ok(DeviceConfigInput {
            host: host.to_string(),
            token: token.to_string(),
            name: name.map(str::to_string),
            platform: platform.map(str::to_string),
        }),
        _ => Err(errors),
    }
}

fn required_str<'a>(raw: &'a Value, key: &str, errors: &mut SchemaErrors) -> Option<&'a str> {
    match raw.get(key) {
        None | Some(Value::Null) => {
            errors.insert(key.to_string(), ERROR_REQUIRED.to_string());
            None
        }
        Some(value) => expect_str(value, key, errors),
    }
}

fn optional_str<'a>(raw: &'a Value, key: &str, errors: &mut SchemaErrors) -> Option<&'a str> {
    match raw.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => expect_str(value, key, errors),
    }
}

fn expect_str<'a>(value: &'a Value, key: &str, errors: &mut SchemaErrors) -> Option<&'a str> {
    let s = value.as_str();
    if s.is_none() {
        errors.insert(key.to_string(), ERROR_INVALID_TYPE.to_string());
    }
    s
}
