//! Config Entries
//!
//! This crate provides the configuration entry system for Home Assistant.
//! Config entries represent individual integration instances and manage
//! their lifecycle (setup, unload, reload). Config flows create them.
//!
//! # Key Types
//!
//! - [`ConfigEntry`] - A single integration configuration
//! - [`ConfigEntryState`] - Lifecycle state of an entry
//! - [`ConfigEntries`] - Manager for all config entries
//! - [`FlowManager`] - Active config flows and their completion
//!
//! # Storage
//!
//! Config entries are persisted in `.storage/core.config_entries` with
//! version tracking.

pub mod entry;
pub mod flow;
pub mod helpers;
pub mod manager;
pub mod state_machine;
pub mod storage;

// Re-export main types
pub use entry::{ConfigEntry, ConfigEntrySource, ConfigEntryState, ConfigEntryUpdate, EntryData};

pub use flow::{
    ConfigFlow, FlowContext, FlowFactory, FlowManager, FlowManagerError, FlowManagerResult,
    FlowResult, FlowResultType, FormField, STEP_USER,
};

pub use helpers::format_mac;

pub use manager::{
    setup_handler, ConfigEntries, ConfigEntriesData, ConfigEntriesError, ConfigEntriesResult,
    SetupHandler, STORAGE_KEY, STORAGE_MINOR_VERSION, STORAGE_VERSION,
};

pub use state_machine::InvalidTransition;

pub use storage::{Storable, Storage, StorageError, StorageResult};
