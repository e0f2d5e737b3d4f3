//! Transparent persistence for plain-data objects.
//!
//! A store wraps a JSON-shaped object so that every field read and write is
//! mirrored to a string key-value [`Backend`](kvp_backend::Backend), after
//! passing through a validate-then-modify [`Pipeline`].
//!
//! # Store Kinds
//!
//! - [`ObjectStore`] -- the whole object lives under one backend key. In
//!   partial mode several stores share that key, each owning only the fields
//!   named in its defaults.
//! - [`SeparateStore`] -- every field lives under its own key, optionally
//!   prefixed with an id (`"{id}.{field}"`).
//!
//! Reading an object or array field returns a [`Nested`] handle; writing
//! through it at any depth re-persists the owning top-level field.
//!
//! # Design Rules
//!
//! 1. Validation runs before anything is written. A rejected write changes
//!    neither the backend nor the in-memory object.
//! 2. Configuration defaults are resolved once, at construction.
//! 3. Nested handles are created per read and hold no backend state.
//! 4. Backend and codec errors are propagated unchanged.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use kvp_backend::{Backend, InMemoryBackend};
//! use kvp_store::{keys_valid, SeparateConfig, SeparateStore};
//! use serde_json::json;
//!
//! let backend = Arc::new(InMemoryBackend::new());
//! let prefs = SeparateStore::new(
//!     json!({"theme": "dark", "recent": []}),
//!     SeparateConfig::new().with_id("prefs").with_backend(backend.clone()),
//! )
//! .unwrap();
//!
//! let recent = prefs.get("recent").unwrap().into_nested().unwrap();
//! recent.push(json!("notes.txt")).unwrap();
//! assert_eq!(backend.get("prefs.recent").unwrap().as_deref(), Some(r#"["notes.txt"]"#));
//! # let _ = keys_valid;
//! ```

pub mod config;
pub mod error;
pub mod key;
pub mod nested;
pub mod object;
pub mod separate;

pub use config::{ObjectConfig, SeparateConfig, StoreOptions};
pub use error::{StoreError, StoreResult};
pub use key::prefixed_key;
pub use nested::{is_nestable, Field, FieldWriter, Nested, PathSegment};
pub use object::ObjectStore;
pub use separate::SeparateStore;

// Pipeline vocabulary, re-exported so callers need a single import.
pub use kvp_pipeline::{keys_valid, type_name, types_valid, Action, BoxError, Validity};
