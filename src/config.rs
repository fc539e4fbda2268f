//! Result store configuration.
//!
//! ```json
//! { "backing": { "kind": "file", "directory": "/tmp/resolution" },
//!   "record_buffer_capacity": 4096 }
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::store::{BinaryStore, FileBinaryStore, InMemoryBinaryStore, StoreError};

/// Where record streams are kept until they are materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreBacking {
    /// Keep records in memory.
    Memory,
    /// Append records to a file under `directory`.
    File {
        /// Directory holding the store files.
        directory: PathBuf,
    },
}

impl Default for StoreBacking {
    fn default() -> Self {
        Self::Memory
    }
}

/// Error loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The JSON document is invalid.
    #[error("Invalid result store configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration of the streaming result store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultStoreConfig {
    /// Store backing.
    pub backing: StoreBacking,
    /// Initial capacity of the per-record encode buffer, also used as the
    /// write buffer size of file stores.
    pub record_buffer_capacity: usize,
}

impl Default for ResultStoreConfig {
    fn default() -> Self {
        Self {
            backing: StoreBacking::Memory,
            record_buffer_capacity: 4096,
        }
    }
}

impl ResultStoreConfig {
    /// In-memory configuration.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed configuration.
    pub fn in_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            backing: StoreBacking::File {
                directory: directory.into(),
            },
            ..Self::default()
        }
    }

    /// Parse a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Open a fresh store for one resolution.
    pub fn open_store(&self) -> Result<Box<dyn BinaryStore>, StoreError> {
        match &self.backing {
            StoreBacking::Memory => Ok(Box::new(InMemoryBinaryStore::with_capacity(
                self.record_buffer_capacity,
            ))),
            StoreBacking::File { directory } => Ok(Box::new(FileBinaryStore::create_with_capacity(
                directory,
                self.record_buffer_capacity,
            )?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResultStoreConfig::from_json("{}").unwrap();
        assert_eq!(config, ResultStoreConfig::default());
        assert_eq!(config.backing, StoreBacking::Memory);
    }

    #[test]
    fn test_file_backing_from_json() {
        let config = ResultStoreConfig::from_json(
            r#"{ "backing": { "kind": "file", "directory": "/var/tmp/results" }, "record_buffer_capacity": 128 }"#,
        )
        .unwrap();
        assert_eq!(config, ResultStoreConfig {
            record_buffer_capacity: 128,
            ..ResultStoreConfig::in_directory("/var/tmp/results")
        });
    }

    #[test]
    fn test_invalid_json() {
        let err = ResultStoreConfig::from_json(r#"{ "backing": { "kind": "tape" } }"#).unwrap_err();
        assert!(err.to_string().starts_with("Invalid result store configuration"));
    }

    #[test]
    fn test_open_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ResultStoreConfig::in_directory(dir.path()).open_store().unwrap();
        store.write(&[1, 2, 3]).unwrap();
        let data = store.done().unwrap();
        assert_eq!(data.len(), 3);
    }
}
