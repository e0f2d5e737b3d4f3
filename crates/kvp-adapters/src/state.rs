//! Binding a per-field store to framework-managed state.
//!
//! The host hands over the current value of every field and a setter.
//! Writes go through the pipeline, then to the setter. Without a getter,
//! reads are served from memory; with one, every read asks the host and
//! runs the result through the pipeline.

use std::collections::BTreeSet;
use std::sync::Arc;

use kvp_backend::{Backend, BackendError, BackendResult};
use kvp_codec::{Codec, JsonCodec};
use kvp_store::{Field, SeparateConfig, SeparateStore, StoreError, StoreResult};
use serde_json::{Map, Value};
use tracing::trace;

/// Receives every accepted write for a field.
pub trait StateSetter: Send + Sync {
    fn set_state(&self, field: &str, value: Value);
}

impl<F> StateSetter for F
where
    F: Fn(&str, Value) + Send + Sync,
{
    fn set_state(&self, field: &str, value: Value) {
        self(field, value)
    }
}

/// Reports the host's current value for a field, if it has one.
pub trait StateGetter: Send + Sync {
    fn get_state(&self, field: &str) -> Option<Value>;
}

impl<F> StateGetter for F
where
    F: Fn(&str) -> Option<Value> + Send + Sync,
{
    fn get_state(&self, field: &str) -> Option<Value> {
        self(field)
    }
}

/// A [`SeparateStore`] whose persistence is a host's state setters.
///
/// Only fields present in the initial values may be written; anything else
/// fails with [`StoreError::UndeclaredField`].
pub struct StateStore {
    store: SeparateStore,
    declared: BTreeSet<String>,
}

impl StateStore {
    /// Bind `current` (an object of field values) to `setter`.
    ///
    /// The validator and modifier of `config` apply as usual. Its flags,
    /// codec and backend are replaced: reads never hit the host and writes
    /// are handed to the setter as decoded values.
    pub fn new(
        current: Value,
        setter: impl StateSetter + 'static,
        config: SeparateConfig,
    ) -> StoreResult<Self> {
        Self::bind(current, Arc::new(setter), None, config)
    }

    /// Like [`new`](Self::new), but every read fetches the host's value
    /// through `getter`, so changes made outside the store are seen.
    /// A field the getter has no value for reads as its initial value.
    pub fn with_getter(
        current: Value,
        setter: impl StateSetter + 'static,
        getter: impl StateGetter + 'static,
        config: SeparateConfig,
    ) -> StoreResult<Self> {
        Self::bind(current, Arc::new(setter), Some(Arc::new(getter)), config)
    }

    fn bind(
        current: Value,
        setter: Arc<dyn StateSetter>,
        getter: Option<Arc<dyn StateGetter>>,
        config: SeparateConfig,
    ) -> StoreResult<Self> {
        let Value::Object(fields) = current else {
            return Err(StoreError::NotAnObject {
                key: "current".into(),
            });
        };
        let declared: BTreeSet<String> = fields.keys().cloned().collect();
        let check_gets = getter.is_some();

        let backend = SetterBackend {
            id: config.id.clone(),
            codec: JsonCodec::new(),
            setter,
            getter,
        };
        let config = SeparateConfig {
            check_gets,
            check_defaults: false,
            codec: Some(Arc::new(JsonCodec::new())),
            backend: Some(Arc::new(backend)),
            ..config
        };

        Ok(Self {
            store: SeparateStore::new(Value::Object(fields), config)?,
            declared,
        })
    }

    /// Build the initial values and setter together, the way a framework
    /// hook hands back a value and its setter for each default.
    pub fn from_defaults<I, S>(defaults: Value, init: I, config: SeparateConfig) -> StoreResult<Self>
    where
        I: FnOnce(&Map<String, Value>) -> (Map<String, Value>, S),
        S: StateSetter + 'static,
    {
        let Value::Object(defaults) = defaults else {
            return Err(StoreError::NotAnObject {
                key: "defaults".into(),
            });
        };
        let (current, setter) = init(&defaults);
        Self::new(Value::Object(current), setter, config)
    }

    /// Read a field, from the host if a getter was given, else from memory.
    pub fn get(&self, field: &str) -> StoreResult<Field<'_>> {
        self.store.get(field)
    }

    pub fn get_value(&self, field: &str) -> StoreResult<Option<Value>> {
        self.store.get_value(field)
    }

    /// Validate and write a declared field, then notify the setter.
    pub fn set(&self, field: &str, value: Value) -> StoreResult<()> {
        if !self.declared.contains(field) {
            return Err(StoreError::UndeclaredField {
                field: field.to_string(),
            });
        }
        self.store.set(field, value)
    }

    pub fn snapshot(&self) -> StoreResult<Map<String, Value>> {
        self.store.snapshot()
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("declared", &self.declared)
            .finish_non_exhaustive()
    }
}

/// Routes encoded writes to a [`StateSetter`] and reads to an optional
/// [`StateGetter`]. Without a getter reads always miss.
struct SetterBackend {
    id: Option<String>,
    codec: JsonCodec,
    setter: Arc<dyn StateSetter>,
    getter: Option<Arc<dyn StateGetter>>,
}

impl SetterBackend {
    fn field<'k>(&self, key: &'k str) -> &'k str {
        match self.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => key
                .strip_prefix(id)
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(key),
            None => key,
        }
    }
}

impl Backend for SetterBackend {
    fn get(&self, key: &str) -> BackendResult<Option<String>> {
        let Some(getter) = &self.getter else {
            return Ok(None);
        };
        let field = self.field(key);
        getter
            .get_state(field)
            .map(|value| {
                self.codec
                    .stringify(&value)
                    .map_err(|e| BackendError::Serialization(e.to_string()))
            })
            .transpose()
    }

    fn set(&self, key: &str, value: &str) -> BackendResult<()> {
        let field = self.field(key);
        // The decoded copy is detached from any nested handle the caller holds.
        let decoded = self
            .codec
            .parse(value)
            .map_err(|e| BackendError::Serialization(e.to_string()))?;
        trace!(field, "forwarding write to state setter");
        self.setter.set_state(field, decoded);
        Ok(())
    }
}
