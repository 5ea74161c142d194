//! Config Entries Manager
//!
//! Manages the lifecycle of configuration entries.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use futures::future::{BoxFuture, Future, FutureExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::entry::{ConfigEntry, ConfigEntryState, ConfigEntryUpdate};
use crate::state_machine::InvalidTransition;
use crate::storage::{Storable, Storage, StorageError};

/// Storage key for config entries
pub const STORAGE_KEY: &str = "core.config_entries";
pub const STORAGE_VERSION: u32 = 1;
pub const STORAGE_MINOR_VERSION: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigEntriesError {
    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Entry already exists for domain {domain} with unique_id {unique_id}")]
    AlreadyExists { domain: String, unique_id: String },

    #[error("Cannot unload entry in state {0:?}")]
    CannotUnload(ConfigEntryState),

    #[error("Setup failed: {0}")]
    SetupFailed(String),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type ConfigEntriesResult<T> = Result<T, ConfigEntriesError>;

/// Config entries data for storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigEntriesData {
    pub entries: Vec<ConfigEntry>,
}

impl Storable for ConfigEntriesData {
    const KEY: &'static str = STORAGE_KEY;
    const VERSION: u32 = STORAGE_VERSION;
    const MINOR_VERSION: u32 = STORAGE_MINOR_VERSION;
}

/// Integration setup function.
///
/// Receives a snapshot of the entry being set up. May return an update to
/// apply to the entry before it is marked loaded (used for data migrations).
pub type SetupHandler = Arc<
    dyn Fn(ConfigEntry) -> BoxFuture<'static, Result<Option<ConfigEntryUpdate>, String>>
        + Send
        + Sync
        + 'static,
>;

/// Wrap an async setup function as a [`SetupHandler`]
pub fn setup_handler<F, Fut>(f: F) -> SetupHandler
where
    F: Fn(ConfigEntry) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<ConfigEntryUpdate>, String>> + Send + 'static,
{
    Arc::new(move |entry: ConfigEntry| f(entry).boxed())
}

/// Config Entries Manager
///
/// Owns every config entry, indexes them by domain and unique id, persists
/// them, and drives setup/unload through the entry state machine.
pub struct ConfigEntries {
    storage: Arc<Storage>,

    /// Primary index: entry_id -> ConfigEntry
    entries: DashMap<String, ConfigEntry>,

    /// Index: domain -> set of entry_ids
    by_domain: DashMap<String, HashSet<String>>,

    /// Index: (domain, unique_id) -> entry_id
    by_unique_id: DashMap<(String, String), String>,

    /// Prevents concurrent setup/unload
    setup_lock: Mutex<()>,

    setup_handlers: DashMap<String, SetupHandler>,
}

impl ConfigEntries {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            entries: DashMap::new(),
            by_domain: DashMap::new(),
            by_unique_id: DashMap::new(),
            setup_lock: Mutex::new(()),
            setup_handlers: DashMap::new(),
        }
    }

    /// Load entries from storage
    pub async fn load(&self) -> ConfigEntriesResult<()> {
        if let Some(data) = self.storage.load::<ConfigEntriesData>().await? {
            info!("Loading {} config entries from storage", data.entries.len());
            for entry in data.entries {
                self.index_entry(&entry);
            }
        }
        Ok(())
    }

    /// Save entries to storage
    pub async fn save(&self) -> ConfigEntriesResult<()> {
        let data = ConfigEntriesData {
            entries: self.iter().collect(),
        };
        self.storage.save(&data).await?;
        debug!("Saved {} config entries to storage", data.entries.len());
        Ok(())
    }

    fn index_entry(&self, entry: &ConfigEntry) {
        let entry_id = entry.entry_id.clone();

        self.entries.insert(entry_id.clone(), entry.clone());

        self.by_domain
            .entry(entry.domain.clone())
            .or_default()
            .insert(entry_id.clone());

        if let Some(ref unique_id) = entry.unique_id {
            self.by_unique_id
                .insert((entry.domain.clone(), unique_id.clone()), entry_id);
        }
    }

    fn unindex_entry(&self, entry: &ConfigEntry) {
        if let Some(mut ids) = self.by_domain.get_mut(&entry.domain) {
            ids.remove(&entry.entry_id);
        }

        if let Some(ref unique_id) = entry.unique_id {
            self.by_unique_id
                .remove(&(entry.domain.clone(), unique_id.clone()));
        }

        self.entries.remove(&entry.entry_id);
    }

    pub fn get(&self, entry_id: &str) -> Option<ConfigEntry> {
        self.entries.get(entry_id).map(|r| r.value().clone())
    }

    pub fn get_by_domain(&self, domain: &str) -> Vec<ConfigEntry> {
        self.by_domain
            .get(domain)
            .map(|ids| ids.iter().filter_map(|id| self.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn get_by_unique_id(&self, domain: &str, unique_id: &str) -> Option<ConfigEntry> {
        self.by_unique_id
            .get(&(domain.to_string(), unique_id.to_string()))
            .and_then(|entry_id| self.get(&entry_id))
    }

    /// Add a new config entry
    pub async fn add(&self, entry: ConfigEntry) -> ConfigEntriesResult<ConfigEntry> {
        if let Some(ref unique_id) = entry.unique_id {
            if self.get_by_unique_id(&entry.domain, unique_id).is_some() {
                return Err(ConfigEntriesError::AlreadyExists {
                    domain: entry.domain.clone(),
                    unique_id: unique_id.clone(),
                });
            }
        }

        self.index_entry(&entry);
        if let Err(err) = self.save().await {
            self.unindex_entry(&entry);
            return Err(err);
        }

        info!(
            "Added config entry: {} ({}) [{}]",
            entry.title, entry.domain, entry.entry_id
        );

        Ok(entry)
    }

    /// Update an existing entry
    pub async fn update(
        &self,
        entry_id: &str,
        update: ConfigEntryUpdate,
    ) -> ConfigEntriesResult<ConfigEntry> {
        let previous = self
            .get(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;
        let mut updated = previous.clone();

        self.unindex_entry(&updated);

        if let Some(title) = update.title {
            updated.title = title;
        }
        if let Some(data) = update.data {
            updated.data = data;
        }
        if let Some(options) = update.options {
            updated.options = options;
        }
        if let Some(unique_id) = update.unique_id {
            updated.unique_id = unique_id;
        }
        updated.modified_at = Utc::now();

        self.index_entry(&updated);
        if let Err(err) = self.save().await {
            self.unindex_entry(&updated);
            self.index_entry(&previous);
            return Err(err);
        }

        debug!("Updated config entry: {}", entry_id);
        Ok(updated)
    }

    /// Remove an entry
    pub async fn remove(&self, entry_id: &str) -> ConfigEntriesResult<ConfigEntry> {
        let entry = self
            .get(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

        self.unindex_entry(&entry);
        if let Err(err) = self.save().await {
            self.index_entry(&entry);
            return Err(err);
        }

        info!(
            "Removed config entry: {} ({}) [{}]",
            entry.title, entry.domain, entry_id
        );

        Ok(entry)
    }

    /// Transition an entry's state through the entry state machine
    fn transition(
        &self,
        entry_id: &str,
        state: ConfigEntryState,
        reason: Option<String>,
    ) -> ConfigEntriesResult<()> {
        let mut entry = self
            .entries
            .get_mut(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;
        entry.try_set_state(state, reason)?;
        debug!("Entry {} state changed to {:?}", entry_id, state);
        Ok(())
    }

    /// Register a setup handler for a domain
    pub fn register_setup_handler(&self, domain: &str, handler: SetupHandler) {
        self.setup_handlers.insert(domain.to_string(), handler);
        debug!("Registered setup handler for domain: {}", domain);
    }

    /// Set up an entry (call the integration's setup handler)
    pub async fn setup(&self, entry_id: &str) -> ConfigEntriesResult<()> {
        let _lock = self.setup_lock.lock().await;

        let entry = self
            .get(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

        self.transition(entry_id, ConfigEntryState::SetupInProgress, None)?;

        // Clone out of the map so no shard guard is held across the await
        let handler = self
            .setup_handlers
            .get(&entry.domain)
            .map(|h| h.value().clone());

        let Some(handler) = handler else {
            self.transition(entry_id, ConfigEntryState::Loaded, None)?;
            debug!(
                "No setup handler for domain {}, marking as loaded",
                entry.domain
            );
            return Ok(());
        };

        match handler(entry.clone()).await {
            Ok(migration) => {
                if let Some(update) = migration {
                    self.update(entry_id, update).await?;
                }
                self.transition(entry_id, ConfigEntryState::Loaded, None)?;
                info!("Setup completed for entry: {} ({})", entry.title, entry_id);
                Ok(())
            }
            Err(reason) => {
                warn!("Setup failed for entry {}: {}", entry_id, reason);
                self.transition(entry_id, ConfigEntryState::SetupError, Some(reason.clone()))?;
                Err(ConfigEntriesError::SetupFailed(reason))
            }
        }
    }

    /// Unload an entry. Entries that were never loaded are left alone.
    pub async fn unload(&self, entry_id: &str) -> ConfigEntriesResult<()> {
        let _lock = self.setup_lock.lock().await;

        let entry = self
            .get(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

        if !entry.state.is_recoverable() {
            return Err(ConfigEntriesError::CannotUnload(entry.state));
        }
        if entry.state == ConfigEntryState::NotLoaded {
            return Ok(());
        }

        self.transition(entry_id, ConfigEntryState::UnloadInProgress, None)?;
        self.transition(entry_id, ConfigEntryState::NotLoaded, None)?;

        info!("Unloaded entry: {} ({})", entry.title, entry_id);
        Ok(())
    }

    /// Reload an entry (unload + setup)
    pub async fn reload(&self, entry_id: &str) -> ConfigEntriesResult<()> {
        debug!("Reloading entry: {}", entry_id);
        self.unload(entry_id).await?;
        self.setup(entry_id).await
    }

    pub fn entry_ids(&self) -> Vec<String> {
        self.entries.iter().map(|r| r.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ConfigEntry> + '_ {
        self.entries.iter().map(|r| r.value().clone())
    }

    /// Set up all entries
    pub async fn setup_all(&self) -> Vec<ConfigEntriesResult<()>> {
        let mut results = Vec::new();
        for entry_id in self.entry_ids() {
            results.push(self.setup(&entry_id).await);
        }
        results
    }
}
