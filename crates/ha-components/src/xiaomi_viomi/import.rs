//! Import of legacy YAML platform configuration
//!
//! ```yaml
//! vacuum:
//!   - platform: xiaomi_viomi
//!     host: 192.168.1.20
//!     token: 0123456789abcdef0123456789abcdef
//!     name: Hallway
//! ```
//!
//! Blocks are taken as written: `!secret` tags are not resolved, and a tagged
//! token fails validation as `invalid_type`.

use ha_config_entries::{ConfigEntries, ConfigEntry, ConfigEntrySource, ConfigEntryUpdate};
use serde_yaml::Value as YamlValue;
use std::sync::Arc;
use tracing::{info, warn};

use super::config_flow::merge_into_existing;
use super::consts::{CONF_PLATFORM, DOMAIN, IMPORT_VERSION};
use super::device::ViomiConnector;
use super::error::ImportError;
use super::logger::FlowLogger;
use super::schema::validate_platform_config;
use super::validate::validate_input;

/// Platform domain these blocks live under
pub const PLATFORM_DOMAIN: &str = "vacuum";

/// Pick this integration's blocks out of a YAML configuration document
pub fn platform_configs(config: &str) -> Result<Vec<YamlValue>, ImportError> {
    let root: YamlValue = serde_yaml::from_str(config)?;

    let blocks = match root.get(PLATFORM_DOMAIN) {
        Some(YamlValue::Sequence(items)) => items.clone(),
        Some(item @ YamlValue::Mapping(_)) => vec![item.clone()],
        _ => Vec::new(),
    };

    Ok(blocks
        .into_iter()
        .filter(|block| block.get(CONF_PLATFORM).and_then(|p| p.as_str()) == Some(DOMAIN))
        .collect())
}

/// Validate one platform block against the device and store it as an entry.
///
/// A device already registered under the same MAC has its entry refreshed
/// and reloaded instead.
pub async fn async_setup_platform(
    entries: &ConfigEntries,
    connector: Arc<dyn ViomiConnector>,
    logger: Arc<dyn FlowLogger>,
    platform_config: &YamlValue,
) -> Result<ConfigEntry, ImportError> {
    let raw = serde_json::to_value(platform_config)?;
    let input = validate_platform_config(&raw).map_err(ImportError::Schema)?;
    let record = validate_input(connector, &input, logger).await?;

    if let Some(existing) = entries.get_by_unique_id(DOMAIN, &record.unique_id) {
        info!(
            "Viomi device {} already configured, refreshing entry {}",
            record.unique_id, existing.entry_id
        );
        let data = merge_into_existing(&existing, &record);
        let entry = entries
            .update(&existing.entry_id, ConfigEntryUpdate::new().data(data))
            .await?;
        entries.reload(&entry.entry_id).await?;
        return Ok(entries.get(&entry.entry_id).unwrap_or(entry));
    }

    let entry = ConfigEntry::new(DOMAIN, record.name.clone())
        .with_data(record.to_entry_data())
        .with_unique_id(record.unique_id.clone())
        .with_source(ConfigEntrySource::Import)
        .with_version(IMPORT_VERSION, 1);
    let entry = entries.add(entry).await?;
    entries.setup(&entry.entry_id).await?;

    Ok(entries.get(&entry.entry_id).unwrap_or(entry))
}

/// Import every platform block found in a YAML document.
///
/// Blocks that fail are logged and skipped.
pub async fn async_import_yaml(
    entries: &ConfigEntries,
    connector: Arc<dyn ViomiConnector>,
    logger: Arc<dyn FlowLogger>,
    config: &str,
) -> Result<Vec<ConfigEntry>, ImportError> {
    let mut imported = Vec::new();
    for block in platform_configs(config)? {
        match async_setup_platform(entries, connector.clone(), logger.clone(), &block).await {
            Ok(entry) => imported.push(entry),
            Err(err) => warn!("Skipping {} platform config: {}", DOMAIN, err),
        }
    }
    Ok(imported)
}
