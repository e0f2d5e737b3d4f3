use serde_json::Value;

use crate::error::CodecResult;

/// Converts between backend strings and structured values.
///
/// A codec carries no store semantics: stores call [`Codec::parse`] on every
/// string they read and [`Codec::stringify`] on every value they write.
pub trait Codec: Send + Sync {
    /// Decode a stored string into a value.
    fn parse(&self, raw: &str) -> CodecResult<Value>;

    /// Encode a value into the string to store.
    fn stringify(&self, value: &Value) -> CodecResult<String>;
}
