//! Adapters that bind kvproxy stores to hosts the backend contract does not
//! fit directly.
//!
//! - [`StateStore`] -- mirrors writes into a UI framework's per-field state
//!   setters instead of a key-value backend.
//! - [`prefetch_separate`] -- loads every field from an asynchronous backend
//!   once, up front, then serves a synchronous [`SeparateStore`] whose writes
//!   are forwarded back in the background.
//!
//! [`SeparateStore`]: kvp_store::SeparateStore

pub mod prefetch;
pub mod state;

pub use prefetch::{prefetch_separate, AsyncBackend, PrefetchedStore};
pub use state::{StateGetter, StateSetter, StateStore};
