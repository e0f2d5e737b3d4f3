//! The process-wide default backend.

use std::sync::{Arc, OnceLock};

use crate::memory::InMemoryBackend;

static AMBIENT: OnceLock<Arc<InMemoryBackend>> = OnceLock::new();

/// The backend every store uses unless configured otherwise.
///
/// One in-memory backend shared by the whole process. Two stores bound to
/// the same key without explicit backends therefore see each other's writes.
pub fn ambient() -> Arc<InMemoryBackend> {
    Arc::clone(AMBIENT.get_or_init(|| Arc::new(InMemoryBackend::new())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Backend;

    #[test]
    fn ambient_is_shared() {
        let a = ambient();
        let b = ambient();
        a.set("kvp-backend.ambient-test", "1").unwrap();
        assert_eq!(
            b.get("kvp-backend.ambient-test").unwrap().as_deref(),
            Some("1")
        );
        assert!(Arc::ptr_eq(&a, &b));
    }
}
