//! Config Entry types
//!
//! A ConfigEntry is the persisted record of one paired device or service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::state_machine::InvalidTransition;

/// Entry data map, as stored on disk
pub type EntryData = HashMap<String, serde_json::Value>;

/// Config entry lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntryState {
    /// Initial state, not yet set up
    #[default]
    NotLoaded,
    /// Currently being set up
    SetupInProgress,
    /// Successfully set up
    Loaded,
    /// Setup failed
    SetupError,
    /// Currently unloading
    UnloadInProgress,
    /// Unload failed (not recoverable)
    FailedUnload,
}

impl ConfigEntryState {
    /// Check if the entry can be unloaded/reloaded from this state
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ConfigEntryState::Loaded | ConfigEntryState::SetupError | ConfigEntryState::NotLoaded
        )
    }
}

/// Source of the config entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntrySource {
    /// Configured via the UI flow
    #[default]
    User,
    /// Imported from YAML config
    Import,
}

impl ConfigEntrySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigEntrySource::User => "user",
            ConfigEntrySource::Import => "import",
        }
    }
}

/// A configuration entry for an integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Unique identifier (ULID)
    pub entry_id: String,

    /// Integration domain (e.g., "xiaomi_viomi")
    pub domain: String,

    /// Human-readable display name
    pub title: String,

    /// Configuration data
    #[serde(default)]
    pub data: EntryData,

    /// User-configurable options
    #[serde(default)]
    pub options: EntryData,

    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_version")]
    pub minor_version: u32,

    /// Key used to detect duplicate registrations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    #[serde(default)]
    pub source: ConfigEntrySource,

    /// Current lifecycle state (not persisted)
    #[serde(skip, default)]
    pub state: ConfigEntryState,

    /// Human-readable explanation for failed states
    #[serde(skip, default)]
    pub reason: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

fn default_version() -> u32 {
    1
}

impl ConfigEntry {
    /// Create a new config entry
    pub fn new(domain: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            entry_id: ulid::Ulid::new().to_string(),
            domain: domain.into(),
            title: title.into(),
            data: HashMap::new(),
            options: HashMap::new(),
            version: 1,
            minor_version: 1,
            unique_id: None,
            source: ConfigEntrySource::User,
            state: ConfigEntryState::NotLoaded,
            reason: None,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn with_data(mut self, data: EntryData) -> Self {
        self.data = data;
        self
    }

    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    pub fn with_source(mut self, source: ConfigEntrySource) -> Self {
        self.source = source;
        self
    }

    pub fn with_version(mut self, version: u32, minor_version: u32) -> Self {
        self.version = version;
        self.minor_version = minor_version;
        self
    }

    /// Read a string value from the entry data
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    pub fn is_loaded(&self) -> bool {
        self.state == ConfigEntryState::Loaded
    }

    /// Attempt to transition to a new state with validation.
    ///
    /// On success, updates the state and reason fields.
    pub fn try_set_state(
        &mut self,
        new_state: ConfigEntryState,
        reason: Option<String>,
    ) -> Result<(), InvalidTransition> {
        self.state = self.state.try_transition(new_state)?;
        self.reason = reason;
        Ok(())
    }
}

/// Update data for a config entry
#[derive(Debug, Default)]
pub struct ConfigEntryUpdate {
    pub title: Option<String>,
    pub data: Option<EntryData>,
    pub options: Option<EntryData>,
    pub unique_id: Option<Option<String>>,
}

impl ConfigEntryUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn data(mut self, data: EntryData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn options(mut self, options: EntryData) -> Self {
        self.options = Some(options);
        self
    }
}
