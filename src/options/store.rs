/// Durable options storage.
///
/// Options live under a single key (`settings`) in a key-value store. Every
/// save writes the full snapshot; there is no partial merge, so an older or
/// newer record is either read whole or rejected whole.
///
/// `FileStore` keeps one JSON file per key inside the data directory.
/// `MemoryStore` is used when persistence is turned off in config.toml.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::model::GameOptions;

pub const SETTINGS_KEY: &str = "settings";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    #[error("storage I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not encode options: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

// ── FileStore ──

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io { path: path.to_path_buf(), source }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(&path)(e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))?;

        // Write beside the target, then rename over it.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).map_err(io_err(&tmp))?;
        std::fs::rename(&tmp, &path).map_err(io_err(&path))
    }
}

// ── MemoryStore ──

#[derive(Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ── OptionsStore ──

pub struct OptionsStore {
    storage: Box<dyn KeyValueStore>,
}

impl OptionsStore {
    pub fn new(storage: Box<dyn KeyValueStore>) -> Self {
        OptionsStore { storage }
    }

    /// Read the stored options. Absent, unreadable or invalid records
    /// fall back to the defaults; nothing is propagated.
    pub fn load(&self) -> GameOptions {
        let text = match self.storage.get(SETTINGS_KEY) {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!("no stored options, using defaults");
                return GameOptions::default();
            }
            Err(e) => {
                warn!(error = %e, "could not read stored options, using defaults");
                return GameOptions::default();
            }
        };

        match serde_json::from_str(&text) {
            Ok(options) => options,
            Err(e) => {
                warn!(error = %e, "stored options are invalid, using defaults");
                GameOptions::default()
            }
        }
    }

    /// Write the full snapshot, replacing any prior value.
    pub fn save(&mut self, options: &GameOptions) -> Result<(), StorageError> {
        let text = serde_json::to_string(options)?;
        self.storage.set(SETTINGS_KEY, &text)
    }
}
