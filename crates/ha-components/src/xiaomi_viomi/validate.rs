//! Validation procedure: user input in, normalized device record out

use ha_config_entries::{format_mac, EntryData};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::consts::{CONF_HOST, CONF_MAC, CONF_MODEL, CONF_NAME, CONF_TOKEN, CONF_UNIQUE_ID};
use super::device::ViomiConnector;
use super::error::FlowError;
use super::hub::ViomiDeviceHub;
use super::logger::FlowLogger;
use super::schema::DeviceConfigInput;

/// A validated device, ready to be stored as entry data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub host: String,
    pub token: String,
    pub model: String,
    /// User-supplied name, or the model
    pub name: String,
    /// Name as submitted; None when omitted or left empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// Canonical MAC
    pub unique_id: String,
    /// Canonical MAC, kept for display
    pub mac: String,
}

impl DeviceRecord {
    pub fn to_entry_data(&self) -> EntryData {
        EntryData::from([
            (CONF_HOST.to_string(), json!(self.host)),
            (CONF_TOKEN.to_string(), json!(self.token)),
            (CONF_MODEL.to_string(), json!(self.model)),
            (CONF_NAME.to_string(), json!(self.name)),
            (CONF_UNIQUE_ID.to_string(), json!(self.unique_id)),
            (CONF_MAC.to_string(), json!(self.mac)),
        ])
    }
}

/// Contact the device and build its record.
///
/// Nothing is returned on failure: an unreachable device is
/// [`FlowError::CannotConnect`], a rejected token [`FlowError::InvalidAuth`].
pub async fn validate_input(
    connector: Arc<dyn ViomiConnector>,
    input: &DeviceConfigInput,
    logger: Arc<dyn FlowLogger>,
) -> Result<DeviceRecord, FlowError> {
    let mut hub = ViomiDeviceHub::new(connector, logger);

    if !hub.attempt_connection(&input.host, &input.token).await? {
        return Err(FlowError::CannotConnect);
    }

    let info = hub
        .device_info()
        .ok_or_else(|| FlowError::Unknown("device reported no identity".to_string()))?;

    let mac = format_mac(&info.mac_address);
    let user_name = input.name.clone().filter(|name| !name.is_empty());
    let name = user_name.clone().unwrap_or_else(|| info.model.clone());

    Ok(DeviceRecord {
        host: input.host.clone(),
        token: input.token.clone(),
        model: info.model.clone(),
        name,
        user_name,
        unique_id: mac.clone(),
        mac,
    })
}
