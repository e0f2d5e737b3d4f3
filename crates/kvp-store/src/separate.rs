//! Per-field stores.
//!
//! A [`SeparateStore`] keeps each field under its own backend key
//! (`"{id}.{field}"`, or the bare field name without an id). The pipeline
//! only ever sees a one-field fragment `{field: value}` together with the
//! field name, so validators and modifiers are scoped to a single field.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use kvp_pipeline::Action;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::config::{ResolvedSeparateConfig, SeparateConfig};
use crate::error::{StoreError, StoreResult};
use crate::key::prefixed_key;
use crate::nested::{Field, FieldWriter};
use crate::object::into_object;

/// A live object whose fields are persisted under separate backend keys.
pub struct SeparateStore {
    defaults: Map<String, Value>,
    config: ResolvedSeparateConfig,
    live: RwLock<Map<String, Value>>,
}

impl SeparateStore {
    /// Create a store from an object of per-field defaults.
    ///
    /// With `check_defaults` on, every declared field is either seeded into
    /// its backend key or read back from it.
    pub fn new(defaults: Value, config: SeparateConfig) -> StoreResult<Self> {
        let config = config.resolve();
        let defaults = into_object(defaults, "defaults")?;
        let store = Self {
            live: RwLock::new(defaults.clone()),
            defaults,
            config,
        };
        if store.config.check_defaults {
            store.initialize()?;
        }
        Ok(store)
    }

    pub fn id(&self) -> Option<&str> {
        self.config.id.as_deref()
    }

    pub fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }

    /// Backend key for `field`.
    pub fn key(&self, field: &str) -> String {
        prefixed_key(self.id(), field)
    }

    /// Backend keys of every field currently held, sorted.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.live_read()?.keys().map(|f| self.key(f)).collect())
    }

    /// A copy of the in-memory values. Does not touch the backend.
    pub fn snapshot(&self) -> StoreResult<Map<String, Value>> {
        Ok(self.live_read()?.clone())
    }

    /// Read a field.
    ///
    /// With `check_gets` on, the field's backend entry is re-read (falling
    /// back to its default when absent) and passed through the pipeline.
    /// A field with neither a stored value nor a default reads as
    /// [`Field::Missing`].
    pub fn get(&self, field: &str) -> StoreResult<Field<'_>> {
        let value = if self.config.check_gets {
            self.read_field(field)?
        } else {
            self.live_read()?.get(field).cloned()
        };
        trace!(id = ?self.config.id, field, found = value.is_some(), "separate store read");
        Ok(Field::wrap(self, field, value))
    }

    pub fn get_value(&self, field: &str) -> StoreResult<Option<Value>> {
        Ok(self.get(field)?.into_value())
    }

    /// Write a field through the pipeline to its own backend key.
    ///
    /// The in-memory value is the pipeline's output, and it is only
    /// updated once the backend write has succeeded.
    pub fn set(&self, field: &str, value: Value) -> StoreResult<()> {
        let key = self.key(field);
        let checked = self.run(field, &key, value, Action::Set)?;
        self.persist(&key, &checked)?;
        self.live_write()?.insert(field.to_string(), checked);
        trace!(key = %key, "separate store write");
        Ok(())
    }

    fn initialize(&self) -> StoreResult<()> {
        for (field, default) in &self.defaults {
            let key = self.key(field);
            let value = match self.read_raw(&key)? {
                None => {
                    let seeded = self.run(field, &key, default.clone(), Action::Set)?;
                    self.persist(&key, &seeded)?;
                    debug!(key = %key, "seeded field from default");
                    seeded
                }
                Some(raw) => {
                    let parsed = self.config.codec.parse(&raw)?;
                    self.run(field, &key, parsed, Action::Get)?
                }
            };
            self.live_write()?.insert(field.clone(), value);
        }
        Ok(())
    }

    fn read_field(&self, field: &str) -> StoreResult<Option<Value>> {
        let key = self.key(field);
        let stored = match self.read_raw(&key)? {
            Some(raw) => self.config.codec.parse(&raw)?,
            None => match self.defaults.get(field) {
                Some(default) => default.clone(),
                None => return Ok(None),
            },
        };

        let checked = self.run(field, &key, stored, Action::Get)?;
        self.live_write()?.insert(field.to_string(), checked.clone());
        Ok(Some(checked))
    }

    fn read_raw(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.config.backend.get_present(key)?)
    }

    fn persist(&self, key: &str, value: &Value) -> StoreResult<()> {
        let encoded = self.config.codec.stringify(value)?;
        self.config.backend.set(key, &encoded)?;
        Ok(())
    }

    /// Run `value` through the pipeline as the fragment `{field: value}`.
    ///
    /// A modifier that drops the field yields `null`.
    fn run(&self, field: &str, key: &str, value: Value, action: Action) -> StoreResult<Value> {
        let mut fragment = Map::new();
        fragment.insert(field.to_string(), value);
        let out = self
            .config
            .pipeline
            .run(Value::Object(fragment), action, key, Some(field))?;
        let mut out = into_object(out, key)?;
        Ok(out.remove(field).unwrap_or(Value::Null))
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

impl FieldWriter for SeparateStore {
    fn write_field(&self, field: &str, value: Value) -> StoreResult<()> {
        self.set(field, value)
    }
}

impl std::fmt::Debug for SeparateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeparateStore")
            .field("id", &self.config.id)
            .field("fields", &self.defaults.keys().collect::<Vec<_>>())
            .field("check_gets", &self.config.check_gets)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use kvp_backend::{Backend, FnBackend, InMemoryBackend};
    use kvp_pipeline::Validity;
    use serde_json::json;

    fn backend() -> Arc<InMemoryBackend> {
        Arc::new(InMemoryBackend::new())
    }

    fn config(backend: &Arc<InMemoryBackend>) -> SeparateConfig {
        SeparateConfig::new().with_backend(backend.clone())
    }

    #[derive(Debug, thiserror::Error)]
    #[error("custom error")]
    struct CustomError;

    // ---- Test 1: every field gets its own key ----
    #[test]
    fn adds_keys_to_backend() {
        let b = backend();
        let _store = SeparateStore::new(json!({"foo": "abc", "bar": "xyz"}), config(&b)).unwrap();
        assert_eq!(b.len(), 2);
        assert_eq!(b.get("foo").unwrap().as_deref(), Some(r#""abc""#));
        assert_eq!(b.get("bar").unwrap().as_deref(), Some(r#""xyz""#));
    }

    // ---- Test 2: writes go to the field's key only ----
    #[test]
    fn modifies_values() {
        let b = backend();
        let store = SeparateStore::new(json!({"foo": "abc", "bar": "xyz"}), config(&b)).unwrap();
        store.set("foo", json!("def")).unwrap();
        assert_eq!(store.get_value("foo").unwrap(), Some(json!("def")));
        assert_eq!(b.get("foo").unwrap().as_deref(), Some(r#""def""#));
        assert_eq!(b.get("bar").unwrap().as_deref(), Some(r#""xyz""#));
    }

    // ---- Test 3: id prefixes every key ----
    #[test]
    fn prefixes_keys_with_id() {
        let b = backend();
        let store = SeparateStore::new(
            json!({"foo": "abc", "bar": "xyz"}),
            config(&b).with_id("test"),
        )
        .unwrap();
        assert_eq!(b.len(), 2);
        assert!(b.get("foo").unwrap().is_none());
        assert!(b.get("bar").unwrap().is_none());
        assert!(b.get("test.foo").unwrap().is_some());
        assert!(b.get("test.bar").unwrap().is_some());
        assert_eq!(store.keys().unwrap(), vec!["test.bar", "test.foo"]);
    }

    // ---- Test 4: reads see external writes ----
    #[test]
    fn retrieves_values_from_backend() {
        let b = backend();
        let store = SeparateStore::new(json!({"foo": "abc", "bar": "xyz"}), config(&b)).unwrap();
        b.set("foo", r#""def""#).unwrap();
        assert_eq!(store.get_value("foo").unwrap(), Some(json!("def")));
    }

    // ---- Test 5: existing values survive construction ----
    #[test]
    fn existing_values_are_read_not_overwritten() {
        let b = backend();
        b.set("foo", "42").unwrap();
        let store = SeparateStore::new(json!({"foo": 0}), config(&b)).unwrap();
        assert_eq!(b.get("foo").unwrap().as_deref(), Some("42"));
        assert_eq!(store.snapshot().unwrap()["foo"], json!(42));
    }

    // ---- Test 6: undeclared fields ----
    #[test]
    fn undeclared_fields() {
        let b = backend();
        let store = SeparateStore::new(json!({"foo": 1}), config(&b)).unwrap();
        assert!(store.get("nope").unwrap().is_missing());

        store.set("extra", json!(true)).unwrap();
        assert_eq!(b.get("extra").unwrap().as_deref(), Some("true"));
        assert_eq!(store.get_value("extra").unwrap(), Some(json!(true)));
    }

    // ---- Test 7: absent entry falls back to default ----
    #[test]
    fn missing_entry_reads_default() {
        let b = backend();
        let store = SeparateStore::new(json!({"foo": "abc"}), config(&b)).unwrap();
        b.set("foo", "").unwrap();
        assert_eq!(store.get_value("foo").unwrap(), Some(json!("abc")));
    }

    // ---- Test 8: nested writes re-persist the field ----
    #[test]
    fn nested_writes_persist_field() {
        let b = backend();
        let store = SeparateStore::new(
            json!({"list": [1, 2], "obj": {"a": 1}}),
            config(&b).with_id("ns"),
        )
        .unwrap();

        store.get("list").unwrap().into_nested().unwrap().push(json!(3)).unwrap();
        assert_eq!(b.get("ns.list").unwrap().as_deref(), Some("[1,2,3]"));

        store
            .get("obj")
            .unwrap()
            .into_nested()
            .unwrap()
            .set("a", json!(2))
            .unwrap();
        assert_eq!(b.get("ns.obj").unwrap().as_deref(), Some(r#"{"a":2}"#));
    }

    // ---- Test 9: pipeline actions ----
    #[test]
    fn modify_called_per_field_with_actions() {
        let b = backend();
        let calls = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(Mutex::new(Action::Get));
        let (c, l) = (Arc::clone(&calls), Arc::clone(&last));
        let store = SeparateStore::new(
            json!({"foo": "bar", "count": 0}),
            config(&b).with_modify(move |value, action, key| {
                assert!(key.is_some());
                c.fetch_add(1, Ordering::SeqCst);
                *l.lock().unwrap() = action;
                value
            }),
        )
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*last.lock().unwrap(), Action::Set);

        store.set("foo", json!("baz")).unwrap();
        assert_eq!(*last.lock().unwrap(), Action::Set);

        store.get("foo").unwrap();
        assert_eq!(*last.lock().unwrap(), Action::Get);
    }

    // ---- Test 10: modifying sets ----
    #[test]
    fn modifies_sets() {
        let b = backend();
        let store = SeparateStore::new(
            json!({"foo": "bar"}),
            config(&b).with_modify(|mut value, action, key| {
                if let (Action::Set, Some(key)) = (action, key) {
                    let suffixed = format!("{} SET", value[key].as_str().unwrap_or_default());
                    value[key] = json!(suffixed);
                }
                value
            }),
        )
        .unwrap();

        assert_eq!(store.get_value("foo").unwrap(), Some(json!("bar SET")));
        store.set("foo", json!("baz")).unwrap();
        assert_eq!(store.get_value("foo").unwrap(), Some(json!("baz SET")));
        b.set("foo", r#""bar""#).unwrap();
        assert_eq!(store.get_value("foo").unwrap(), Some(json!("bar")));
    }

    // ---- Test 11: modifying gets ----
    #[test]
    fn modifies_gets() {
        let b = backend();
        let store = SeparateStore::new(
            json!({"foo": "bar"}),
            config(&b).with_modify(|mut value, action, key| {
                if let (Action::Get, Some(key)) = (action, key) {
                    let suffixed = format!("{} GET", value[key].as_str().unwrap_or_default());
                    value[key] = json!(suffixed);
                }
                value
            }),
        )
        .unwrap();

        assert_eq!(store.get_value("foo").unwrap(), Some(json!("bar GET")));
        store.set("foo", json!("baz")).unwrap();
        assert_eq!(store.get_value("foo").unwrap(), Some(json!("baz GET")));
        b.set("foo", r#""bar""#).unwrap();
        assert_eq!(store.get_value("foo").unwrap(), Some(json!("bar GET")));
    }

    // ---- Test 12: validation errors ----
    #[test]
    fn throws_when_invalid() {
        let b = backend();
        let store = SeparateStore::new(
            json!({"foo": "bar"}),
            config(&b).with_validate(|value, _, _| (value["foo"] != "baz").into()),
        )
        .unwrap();

        assert!(store.set("foo", json!("abc")).is_ok());
        let err = store.set("foo", json!("baz")).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            "validation failed while setting to foo in storage"
        );
        assert_eq!(b.get("foo").unwrap().as_deref(), Some(r#""abc""#));
        assert_eq!(store.snapshot().unwrap()["foo"], json!("abc"));

        assert!(store.get("foo").is_ok());
        b.set("foo", r#""baz""#).unwrap();
        assert!(store.get("foo").unwrap_err().is_validation());
    }

    // ---- Test 13: custom validation errors ----
    #[test]
    fn throws_custom_errors() {
        let b = backend();
        let store = SeparateStore::new(
            json!({"foo": "bar"}),
            config(&b).with_validate(|value, _, _| {
                if value["foo"] == "baz" {
                    Validity::reject(CustomError)
                } else {
                    Validity::Valid
                }
            }),
        )
        .unwrap();

        assert!(store.set("foo", json!("abc")).is_ok());
        assert!(store
            .set("foo", json!("baz"))
            .unwrap_err()
            .rejection::<CustomError>()
            .is_some());

        b.set("foo", r#""baz""#).unwrap();
        assert!(store
            .get("foo")
            .unwrap_err()
            .rejection::<CustomError>()
            .is_some());
    }

    // ---- Test 14: check_gets off never re-reads ----
    #[test]
    fn check_gets_off_reads_once_per_field() {
        let inner = backend();
        let reads = Arc::new(AtomicUsize::new(0));
        let (r, w, counter) = (inner.clone(), inner.clone(), Arc::clone(&reads));
        let counting = FnBackend::new(
            move |key| {
                counter.fetch_add(1, Ordering::SeqCst);
                r.get(key)
            },
            move |key, value| w.set(key, value),
        );
        let store = SeparateStore::new(
            json!({"foo": 1}),
            SeparateConfig::new()
                .with_backend(Arc::new(counting))
                .with_check_gets(false),
        )
        .unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        for _ in 0..3 {
            assert_eq!(store.get_value("foo").unwrap(), Some(json!(1)));
        }
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    // ---- Test 15: check_defaults off leaves backend alone ----
    #[test]
    fn check_defaults_off_skips_seeding() {
        let b = backend();
        let store = SeparateStore::new(
            json!({"foo": 1}),
            config(&b).with_check_defaults(false).with_check_gets(false),
        )
        .unwrap();
        assert!(b.is_empty());
        assert_eq!(store.get_value("foo").unwrap(), Some(json!(1)));
    }

    // ---- Test 16: stores sharing a key see each other's writes ----
    #[test]
    fn shared_field_keys() {
        let b = backend();
        let a = SeparateStore::new(json!({"foo": 1, "a": true}), config(&b)).unwrap();
        let c = SeparateStore::new(json!({"foo": 2, "c": true}), config(&b)).unwrap();
        assert_eq!(c.get_value("foo").unwrap(), Some(json!(1)));
        c.set("foo", json!(3)).unwrap();
        assert_eq!(a.get_value("foo").unwrap(), Some(json!(3)));
    }
}
