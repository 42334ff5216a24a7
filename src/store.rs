//! Key-value persistence for editor state.
//!
//! The editor only ever stores one flat JSON list (marks), but the backend is
//! injected so hosts can choose a directory of files, memory, or nothing.
//! Reads that fail behave like a missing key; writes return a [`StoreError`]
//! that callers log and otherwise ignore.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Minimal byte-oriented storage, modelled after browser local storage.
pub trait KeyValueStore: Send {
    /// Stored bytes for `key`, or `None` when absent or unreadable.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Overwrite `key` with `value`.
    ///
    /// # Errors
    ///
    /// Backend-specific failure (invalid key, I/O).
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError>;
}

/// In-process map. Contents are lost on drop.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), value.to_vec());
        Ok(())
    }
}

/// One file per key under a directory, created on first write.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let path = match self.path_for(key) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(error = %e, "file store read rejected");
                return None;
            }
        };
        match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "file store read failed");
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(path, value)?;
        Ok(())
    }
}

/// Discards writes and never returns data.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl KeyValueStore for NullStore {
    fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&mut self, _key: &str, _value: &[u8]) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Load and decode a JSON value. Malformed data is logged and treated as
/// absent.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_slice(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, key, "stored value is malformed; ignoring");
            None
        }
    }
}

/// Encode and store a JSON value.
///
/// # Errors
///
/// Serialization or backend failure.
pub fn save_json<T: Serialize>(store: &mut dyn KeyValueStore, key: &str, value: &T) -> Result<(), StoreError> {
    let raw = serde_json::to_vec(value)?;
    store.set(key, &raw)
}
