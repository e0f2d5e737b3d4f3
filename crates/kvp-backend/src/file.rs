//! Durable backend keeping every entry in one JSON file.
//!
//! The file holds a single JSON object mapping keys to their string values.
//! It is read once on [`FileBackend::open`] and rewritten on every
//! [`Backend::set`]: the new contents go to a temporary file in the same
//! directory, which is then renamed over the target so a crash mid-write
//! never leaves a truncated file behind.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::debug;

use crate::error::{BackendError, BackendResult};
use crate::traits::Backend;

/// A [`Backend`] persisted to a JSON file on disk.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileBackend {
    /// Open (or create) the backend file at `path`.
    ///
    /// A missing file starts out empty; it is created on the first write.
    pub fn open(path: impl AsRef<Path>) -> BackendResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)
                    .map_err(|e| BackendError::Serialization(format!("{}: {e}", path.display())))?
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), entries = entries.len(), "opened file backend");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sorted list of every stored key.
    pub fn keys(&self) -> BackendResult<Vec<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| BackendError::LockPoisoned(e.to_string()))?;
        Ok(entries.keys().cloned().collect())
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> BackendResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let body = serde_json::to_vec_pretty(entries)
            .map_err(|e| BackendError::Serialization(e.to_string()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&body)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| BackendError::Io(e.error))?;
        Ok(())
    }
}

impl Backend for FileBackend {
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
        // Only a successful flush makes the new entry visible.
        let mut updated = entries.clone();
        updated.insert(key.to_string(), value.to_string());
        self.flush(&updated)?;
        *entries = updated;
        Ok(())
    }
}
