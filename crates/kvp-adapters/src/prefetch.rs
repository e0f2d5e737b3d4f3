//! Per-field stores over asynchronous backends.
//!
//! The synchronous store contract cannot await, so every declared field is
//! fetched once, concurrently, before the store is built. After that reads
//! are served from memory and writes are queued to a background task that
//! forwards them to the asynchronous backend in order.

use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use kvp_backend::{Backend, BackendError, BackendResult};
use kvp_store::{prefixed_key, SeparateConfig, SeparateStore, StoreError, StoreResult};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

/// A string key-value backend whose operations complete asynchronously.
#[async_trait]
pub trait AsyncBackend: Send + Sync {
    async fn get(&self, key: &str) -> BackendResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> BackendResult<()>;

    /// Read `key`, treating an empty string as absent.
    async fn get_present(&self, key: &str) -> BackendResult<Option<String>> {
        Ok(self.get(key).await?.filter(|v| !v.is_empty()))
    }
}

/// Fetch every field of `defaults` from `backend` and build a store over the
/// results.
///
/// Fields with a stored value are decoded with the configured codec; the
/// rest take their default. Nothing is validated or written during the
/// fetch. The returned store has `check_gets` and `check_defaults` off.
pub async fn prefetch_separate(
    defaults: Value,
    backend: Arc<dyn AsyncBackend>,
    config: SeparateConfig,
) -> StoreResult<PrefetchedStore> {
    let Value::Object(defaults) = defaults else {
        return Err(StoreError::NotAnObject {
            key: "defaults".into(),
        });
    };
    let codec = config.codec_or_default();

    let mut fetches = JoinSet::new();
    for field in defaults.keys() {
        let key = prefixed_key(config.id.as_deref(), field);
        let field = field.clone();
        let backend = Arc::clone(&backend);
        fetches.spawn(async move {
            let raw = backend.get_present(&key).await;
            (field, raw)
        });
    }

    let mut current = Map::new();
    while let Some(joined) = fetches.join_next().await {
        let (field, raw) = joined.map_err(|e| BackendError::custom(e.to_string()))?;
        let value = match raw? {
            Some(raw) => codec.parse(&raw)?,
            None => defaults.get(&field).cloned().unwrap_or(Value::Null),
        };
        current.insert(field, value);
    }
    debug!(id = ?config.id, fields = current.len(), "prefetched fields");

    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(run_writer(rx, backend));

    let config = SeparateConfig {
        check_gets: false,
        check_defaults: false,
        backend: Some(Arc::new(QueueBackend { tx })),
        ..config
    };
    let store = SeparateStore::new(Value::Object(current), config)?;
    Ok(PrefetchedStore { store, writer })
}

/// A [`SeparateStore`] backed by a background writer.
///
/// Dereferences to the store. Writes are queued, not awaited; call
/// [`flush`](Self::flush) to wait until all of them have reached the
/// backend.
pub struct PrefetchedStore {
    store: SeparateStore,
    writer: JoinHandle<()>,
}

impl PrefetchedStore {
    /// Close the write queue and wait for the writer to drain it.
    pub async fn flush(self) -> StoreResult<()> {
        let Self { store, writer } = self;
        drop(store);
        writer
            .await
            .map_err(|e| StoreError::Backend(BackendError::custom(e.to_string())))
    }
}

impl Deref for PrefetchedStore {
    type Target = SeparateStore;

    fn deref(&self) -> &SeparateStore {
        &self.store
    }
}

impl std::fmt::Debug for PrefetchedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchedStore")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Enqueues writes for the background writer. Reads always miss.
struct QueueBackend {
    tx: mpsc::UnboundedSender<(String, String)>,
}

impl Backend for QueueBackend {
    fn get(&self, _key: &str) -> BackendResult<Option<String>> {
        Ok(None)
    }

    fn set(&self, key: &str, value: &str) -> BackendResult<()> {
        self.tx
            .send((key.to_string(), value.to_string()))
            .map_err(|_| BackendError::custom("background writer has stopped"))
    }
}

async fn run_writer(
    mut rx: mpsc::UnboundedReceiver<(String, String)>,
    backend: Arc<dyn AsyncBackend>,
) {
    let mut written = 0usize;
    while let Some((key, value)) = rx.recv().await {
        match backend.set(&key, &value).await {
            Ok(()) => written += 1,
            Err(e) => warn!(key = %key, error = %e, "background write failed"),
        }
    }
    debug!(written, "background writer shut down");
}
