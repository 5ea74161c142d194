//! Config entry setup

use ha_config_entries::{setup_handler, ConfigEntries, ConfigEntry, ConfigEntryUpdate};
use serde_json::json;
use tracing::{debug, info};

use super::consts::{CONF_HOST, CONF_MODEL, CONF_NAME, CONF_TOKEN, DOMAIN};
use super::device::token_prefix;

/// Set up a Viomi config entry.
///
/// Entries written before the model was recorded get `name` and `model`
/// filled from the title; the returned update persists that.
pub async fn async_setup_entry(entry: ConfigEntry) -> Result<Option<ConfigEntryUpdate>, String> {
    let mut data = entry.data.clone();
    let migration = if data.contains_key(CONF_MODEL) {
        None
    } else {
        info!(
            "Migrating legacy entry {} ({}): model set from title",
            entry.entry_id, entry.title
        );
        data.insert(CONF_NAME.to_string(), json!(entry.title));
        data.insert(CONF_MODEL.to_string(), json!(entry.title));
        Some(ConfigEntryUpdate::new().data(data.clone()))
    };

    let host = data
        .get(CONF_HOST)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("entry {} has no {}", entry.entry_id, CONF_HOST))?;
    let token = data
        .get(CONF_TOKEN)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("entry {} has no {}", entry.entry_id, CONF_TOKEN))?;
    let name = data
        .get(CONF_NAME)
        .and_then(|v| v.as_str())
        .unwrap_or(entry.title.as_str());

    debug!(
        "Initializing viomi {} with host {} (token {}...)",
        name,
        host,
        token_prefix(token)
    );

    Ok(migration)
}

/// Install the entry setup handler for this domain
pub fn register(entries: &ConfigEntries) {
    entries.register_setup_handler(DOMAIN, setup_handler(async_setup_entry));
}
