//! Backend built from caller-supplied closures.

use std::fmt;
use std::sync::Arc;

use crate::error::BackendResult;
use crate::traits::Backend;

type GetFn = Arc<dyn Fn(&str) -> BackendResult<Option<String>> + Send + Sync>;
type SetFn = Arc<dyn Fn(&str, &str) -> BackendResult<()> + Send + Sync>;

/// A [`Backend`] whose `get` and `set` are arbitrary closures.
///
/// Use this to route a store's persistence somewhere other than a map, such
/// as a logging shim or a host application's own settings API.
///
/// ```rust
/// use std::collections::HashMap;
/// use std::sync::{Arc, Mutex};
/// use kvp_backend::{Backend, FnBackend};
///
/// let map = Arc::new(Mutex::new(HashMap::<String, String>::new()));
/// let (r, w) = (Arc::clone(&map), Arc::clone(&map));
/// let backend = FnBackend::new(
///     move |key| Ok(r.lock().unwrap().get(key).cloned()),
///     move |key, value| {
///         w.lock().unwrap().insert(key.to_string(), value.to_string());
///         Ok(())
///     },
/// );
/// backend.set("k", "v").unwrap();
/// assert_eq!(backend.get("k").unwrap().as_deref(), Some("v"));
/// ```
#[derive(Clone)]
pub struct FnBackend {
    get: GetFn,
    set: SetFn,
}

impl FnBackend {
    /// Build a backend from a `get` closure and a `set` closure.
    pub fn new<G, S>(get: G, set: S) -> Self
    where
        G: Fn(&str) -> BackendResult<Option<String>> + Send + Sync + 'static,
        S: Fn(&str, &str) -> BackendResult<()> + Send + Sync + 'static,
    {
        Self {
            get: Arc::new(get),
            set: Arc::new(set),
        }
    }
}

impl Backend for FnBackend {
    fn get(&self, key: &str) -> BackendResult<Option<String>> {
        (self.get)(key)
    }

    fn set(&self, key: &str, value: &str) -> BackendResult<()> {
        (self.set)(key, value)
    }
}

impl fmt::Debug for FnBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnBackend").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn closures_are_invoked() {
        let gets = Arc::new(AtomicUsize::new(0));
        let sets = Arc::new(AtomicUsize::new(0));
        let (g, s) = (Arc::clone(&gets), Arc::clone(&sets));
        let backend = FnBackend::new(
            move |_| {
                g.fetch_add(1, Ordering::SeqCst);
                Ok(Some("\"stored\"".into()))
            },
            move |_, _| {
                s.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        );

        assert_eq!(backend.get("x").unwrap().as_deref(), Some("\"stored\""));
        backend.set("x", "1").unwrap();
        backend.set("y", "2").unwrap();
        assert_eq!(gets.load(Ordering::SeqCst), 1);
        assert_eq!(sets.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn errors_propagate() {
        let backend = FnBackend::new(
            |_| Err(BackendError::custom("unavailable")),
            |_, _| Err(BackendError::custom("read-only")),
        );
        assert_eq!(backend.get("k").unwrap_err().to_string(), "unavailable");
        assert_eq!(backend.set("k", "v").unwrap_err().to_string(), "read-only");
    }
}
