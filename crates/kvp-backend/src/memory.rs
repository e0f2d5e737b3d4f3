//! In-memory backend for testing and ephemeral use.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{BackendError, BackendResult};
use crate::traits::Backend;

/// An in-memory implementation of [`Backend`].
///
/// All entries live in a `HashMap` behind a `RwLock`. Data is lost when the
/// backend is dropped.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted list of every stored key.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Remove a key. Returns the value that was stored there.
    pub fn remove(&self, key: &str) -> BackendResult<Option<String>> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| BackendError::LockPoisoned(e.to_string()))?;
        Ok(entries.remove(key))
    }

    /// Remove every key.
    pub fn clear(&self) -> BackendResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| BackendError::LockPoisoned(e.to_string()))?;
        entries.clear();
        Ok(())
    }
}

impl Backend for InMemoryBackend {
    fn get(&self, key: &str) -> BackendResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| BackendError::LockPoisoned(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> BackendResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| BackendError::LockPoisoned(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
