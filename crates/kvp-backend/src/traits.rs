//! The [`Backend`] trait defining the persistence contract.

use crate::error::BackendResult;

/// Synchronous string key-value persistence.
///
/// Implementations must be `Send + Sync` so a single backend can be shared
/// between stores behind an `Arc`. Both operations complete before they
/// return; there is no batching and no transactional grouping across keys.
pub trait Backend: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` if nothing is stored there.
    fn get(&self, key: &str) -> BackendResult<Option<String>>;

    /// Store `value` under `key`, replacing whatever was there.
    fn set(&self, key: &str, value: &str) -> BackendResult<()>;

    /// Read `key`, treating an empty string as absent.
    ///
    /// This is the read stores use: an empty entry is seeded over and
    /// falls back to its default.
    fn get_present(&self, key: &str) -> BackendResult<Option<String>> {
        Ok(self.get(key)?.filter(|v| !v.is_empty()))
    }

    /// Whether `key` holds a non-empty value.
    fn contains(&self, key: &str) -> BackendResult<bool> {
        Ok(self.get_present(key)?.is_some())
    }
}
