//! Whole-object stores.
//!
//! An [`ObjectStore`] persists its entire live object as one encoded blob
//! under a single backend key. In partial mode several stores share that
//! key, each owning the fields named in its own defaults and merging its
//! writes into the blob without touching anyone else's fields.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use kvp_pipeline::Action;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::config::{ObjectConfig, ResolvedObjectConfig};
use crate::error::{StoreError, StoreResult};
use crate::nested::{Field, FieldWriter};

/// A live object persisted as a single backend entry.
///
/// ```rust
/// use std::sync::Arc;
/// use kvp_backend::{Backend, InMemoryBackend};
/// use kvp_store::{ObjectConfig, ObjectStore};
/// use serde_json::json;
///
/// let backend = Arc::new(InMemoryBackend::new());
/// let store = ObjectStore::new(
///     "k",
///     json!({"foo": "bar"}),
///     ObjectConfig::new().with_backend(backend.clone()),
/// )
/// .unwrap();
/// assert_eq!(backend.get("k").unwrap().as_deref(), Some(r#"{"foo":"bar"}"#));
///
/// store.set("foo", json!("baz")).unwrap();
/// assert_eq!(backend.get("k").unwrap().as_deref(), Some(r#"{"foo":"baz"}"#));
/// assert_eq!(store.get_value("foo").unwrap(), Some(json!("baz")));
/// ```
pub struct ObjectStore {
    key: String,
    defaults: Map<String, Value>,
    config: ResolvedObjectConfig,
    live: RwLock<Map<String, Value>>,
}

impl ObjectStore {
    /// Create a store bound to backend key `key`.
    ///
    /// `defaults` must be an object. Unless `check_defaults` is off, the
    /// backend is seeded from the defaults (if the key is empty) or read
    /// back and validated (if it is not).
    pub fn new(key: impl Into<String>, defaults: Value, config: ObjectConfig) -> StoreResult<Self> {
        let key = key.into();
        let defaults = into_object(defaults, &key)?;
        let config = config.resolve();
        let store = Self {
            live: RwLock::new(defaults.clone()),
            key,
            defaults,
            config,
        };
        if store.config.check_defaults {
            store.initialize()?;
        }
        Ok(store)
    }

    /// Create a store whose defaults are any serializable value.
    pub fn from_serialize<T: Serialize>(
        key: impl Into<String>,
        defaults: &T,
        config: ObjectConfig,
    ) -> StoreResult<Self> {
        let defaults = serde_json::to_value(defaults)
            .map_err(|e| kvp_codec::CodecError::Stringify(e.to_string()))?;
        Self::new(key, defaults, config)
    }

    /// The backend key this store is bound to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The defaults the store was created with.
    pub fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }

    pub fn is_partial(&self) -> bool {
        self.config.partial
    }

    /// A copy of the in-memory live object. Does not touch the backend.
    pub fn snapshot(&self) -> StoreResult<Map<String, Value>> {
        Ok(self.live_read()?.clone())
    }

    /// Read a field.
    ///
    /// With `check_gets` on, the backend entry is re-read and re-validated
    /// first. Objects and arrays come back as [`Field::Nested`] handles whose
    /// writes persist through this store.
    pub fn get(&self, field: &str) -> StoreResult<Field<'_>> {
        let value = if !self.config.check_gets {
            self.live_read()?.get(field).cloned()
        } else if self.config.partial {
            self.read_partial(field)?
        } else {
            self.read_whole(field)?
        };
        trace!(key = %self.key, field, found = value.is_some(), "object store read");
        Ok(Field::wrap(self, field, value))
    }

    /// Read a field as a detached value.
    pub fn get_value(&self, field: &str) -> StoreResult<Option<Value>> {
        Ok(self.get(field)?.into_value())
    }

    /// Write a field and persist the result.
    ///
    /// The candidate object (live object plus the new field) is validated
    /// and modified first; only an accepted result reaches the backend and
    /// the live object. A rejected write leaves both untouched.
    pub fn set(&self, field: &str, value: Value) -> StoreResult<()> {
        let mut candidate = self.live_read()?.clone();
        candidate.insert(field.to_string(), value);
        let checked = self.run(candidate, Action::Set)?;

        if self.config.partial {
            let merged = merge(self.read_blob()?, &checked);
            self.persist(&merged)?;
        } else {
            self.persist(&checked)?;
        }

        *self.live_write()? = checked;
        trace!(key = %self.key, field, "object store write");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    fn initialize(&self) -> StoreResult<()> {
        let live = match self.read_raw()? {
            None => {
                let seeded = self.run(self.defaults.clone(), Action::Set)?;
                self.persist(&seeded)?;
                debug!(key = %self.key, "seeded backend from defaults");
                seeded
            }
            Some(raw) if self.config.partial => {
                let blob = self.parse_blob(&raw)?;
                let owned = self.run(self.project(&blob, true), Action::Set)?;
                let merged = merge(blob, &owned);
                self.persist(&merged)?;
                debug!(key = %self.key, owned = owned.len(), "merged owned fields into shared entry");
                owned
            }
            Some(raw) => {
                let blob = self.parse_blob(&raw)?;
                self.run(blob, Action::Get)?
            }
        };
        *self.live_write()? = live;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read paths
    // -----------------------------------------------------------------------

    fn read_whole(&self, field: &str) -> StoreResult<Option<Value>> {
        let checked = self.run(self.read_blob()?, Action::Get)?;
        let value = match checked.get(field) {
            Some(v) if !v.is_null() => Some(v.clone()),
            stored => self
                .defaults
                .get(field)
                .cloned()
                .or_else(|| stored.cloned()),
        };

        let mut live = self.live_write()?;
        match &value {
            Some(v) => live.insert(field.to_string(), v.clone()),
            None => live.remove(field),
        };
        Ok(value)
    }

    /// Partial read: only owned fields are visible, with no default
    /// substitution for fields missing from the shared entry.
    fn read_partial(&self, field: &str) -> StoreResult<Option<Value>> {
        let projected = self.project(&self.read_blob()?, false);
        let checked = self.run(projected, Action::Get)?;
        let value = checked.get(field).cloned();

        // Cross-field validators see the live object with the read applied.
        let mut view = self.live_read()?.clone();
        view.insert(field.to_string(), value.clone().unwrap_or(Value::Null));
        self.run(view, Action::Get)?;

        if self.defaults.contains_key(field) {
            let mut live = self.live_write()?;
            match &value {
                Some(v) => live.insert(field.to_string(), v.clone()),
                None => live.remove(field),
            };
        }
        Ok(value)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn read_raw(&self) -> StoreResult<Option<String>> {
        Ok(self.config.backend.get_present(&self.key)?)
    }

    /// The decoded backend entry; an empty entry reads as an empty object.
    fn read_blob(&self) -> StoreResult<Map<String, Value>> {
        match self.read_raw()? {
            Some(raw) => self.parse_blob(&raw),
            None => Ok(Map::new()),
        }
    }

    fn parse_blob(&self, raw: &str) -> StoreResult<Map<String, Value>> {
        into_object(self.config.codec.parse(raw)?, &self.key)
    }

    fn persist(&self, object: &Map<String, Value>) -> StoreResult<()> {
        let encoded = self.config.codec.stringify(&Value::Object(object.clone()))?;
        self.config.backend.set(&self.key, &encoded)?;
        Ok(())
    }

    fn run(&self, object: Map<String, Value>, action: Action) -> StoreResult<Map<String, Value>> {
        let out = self
            .config
            .pipeline
            .run(Value::Object(object), action, &self.key, None)?;
        into_object(out, &self.key)
    }

    /// The owned subset of `blob`, optionally filling gaps from defaults.
    fn project(&self, blob: &Map<String, Value>, fill_defaults: bool) -> Map<String, Value> {
        let mut owned = Map::new();
        for (name, default) in &self.defaults {
            match blob.get(name) {
                Some(value) => {
                    owned.insert(name.clone(), value.clone());
                }
                None if fill_defaults => {
                    owned.insert(name.clone(), default.clone());
                }
                None => {}
            }
        }
        owned
    }

    fn live_read(&self) -> StoreResult<RwLockReadGuard<'_, Map<String, Value>>> {
        self.live
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn live_write(&self) -> StoreResult<RwLockWriteGuard<'_, Map<String, Value>>> {
        self.live
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl FieldWriter for ObjectStore {
    fn write_field(&self, field: &str, value: Value) -> StoreResult<()> {
        self.set(field, value)
    }
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("key", &self.key)
            .field("partial", &self.config.partial)
            .field("check_gets", &self.config.check_gets)
            .finish_non_exhaustive()
    }
}

pub(crate) fn into_object(value: Value, key: &str) -> StoreResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject {
            key: key.to_string(),
        }),
    }
}

/// `base` with every entry of `owned` written over it.
fn merge(mut base: Map<String, Value>, owned: &Map<String, Value>) -> Map<String, Value> {
    for (name, value) in owned {
        base.insert(name.clone(), value.clone());
    }
    base
}
