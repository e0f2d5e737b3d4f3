//! String key-value backends for kvproxy.
//!
//! A backend is the persistence substrate underneath every proxy store: a
//! synchronous map from string keys to string values. Stores never interpret
//! what a backend holds beyond asking for a key and writing a key back.
//!
//! # Backends
//!
//! All backends implement the [`Backend`] trait:
//!
//! - [`InMemoryBackend`] -- `HashMap`-based backend for tests and embedding
//! - [`FileBackend`] -- durable backend keeping every entry in one JSON file
//! - [`FnBackend`] -- adapter built from a pair of `get`/`set` closures
//!
//! When a store is not handed a backend it falls back to [`ambient()`], a
//! process-wide in-memory backend shared by every store in the process.

pub mod ambient;
pub mod error;
pub mod file;
pub mod func;
pub mod memory;
pub mod traits;

pub use ambient::ambient;
pub use error::{BackendError, BackendResult};
pub use file::FileBackend;
pub use func::FnBackend;
pub use memory::InMemoryBackend;
pub use traits::Backend;
