//! JSON persistence in the `.storage/` directory
//!
//! Each file is a versioned envelope:
//!
//! ```json
//! {
//!   "version": 1,
//!   "minor_version": 5,
//!   "key": "core.config_entries",
//!   "data": { ... }
//! }
//! ```

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported version for {key}: expected {expected}, found {found}")]
    VersionMismatch {
        key: String,
        expected: u32,
        found: u32,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageFile<T> {
    /// Major version - breaking changes
    pub version: u32,
    /// Minor version - additive changes
    pub minor_version: u32,
    pub key: String,
    pub data: T,
}

/// Types persisted under a fixed storage key
pub trait Storable: Serialize + DeserializeOwned {
    const KEY: &'static str;
    const VERSION: u32;
    const MINOR_VERSION: u32;
}

/// Handle on a config directory's `.storage/` folder
#[derive(Debug, Clone)]
pub struct Storage {
    storage_dir: PathBuf,
}

impl Storage {
    /// # Arguments
    /// * `config_dir` - Path to the Home Assistant config directory
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self {
            storage_dir: config_dir.as_ref().join(".storage"),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn file_path(&self, key: &str) -> PathBuf {
        self.storage_dir.join(key)
    }

    /// Load a storable value. Returns None if the file doesn't exist.
    ///
    /// Files written by a newer major version are rejected; older minor
    /// versions load with a warning.
    pub async fn load<T: Storable>(&self) -> StorageResult<Option<T>> {
        let path = self.file_path(T::KEY);
        if !fs::try_exists(&path).await? {
            debug!("Storage file not found: {}", T::KEY);
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let file: StorageFile<T> = serde_json::from_str(&content)?;

        if file.version != T::VERSION {
            return Err(StorageError::VersionMismatch {
                key: T::KEY.to_string(),
                expected: T::VERSION,
                found: file.version,
            });
        }
        if file.minor_version < T::MINOR_VERSION {
            warn!(
                "Storage {} has older minor version ({} < {})",
                T::KEY,
                file.minor_version,
                T::MINOR_VERSION
            );
        }

        debug!(
            "Loaded storage file: {} (v{}.{})",
            T::KEY,
            file.version,
            file.minor_version
        );
        Ok(Some(file.data))
    }

    /// Save a storable value.
    ///
    /// Writes to a temp file first, then renames over the target.
    pub async fn save<T: Storable>(&self, data: &T) -> StorageResult<()> {
        fs::create_dir_all(&self.storage_dir).await?;

        let file = StorageFile {
            version: T::VERSION,
            minor_version: T::MINOR_VERSION,
            key: T::KEY.to_string(),
            data,
        };
        let content = serde_json::to_string_pretty(&file)?;

        let path = self.file_path(T::KEY);
        let temp_path = self.file_path(&format!("{}.tmp", T::KEY));
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &path).await?;

        debug!("Saved storage file: {}", T::KEY);
        Ok(())
    }
}
