//! Value codecs for kvproxy.
//!
//! Backends store strings; stores work with structured [`serde_json::Value`]s.
//! A [`Codec`] converts between the two. [`JsonCodec`] is the default and
//! [`FnCodec`] lets a caller plug in any other text encoding.

pub mod error;
pub mod func;
pub mod json;
pub mod traits;

pub use error::{CodecError, CodecResult};
pub use func::FnCodec;
pub use json::JsonCodec;
pub use traits::Codec;
