use serde_json::Value;

use crate::error::{CodecError, CodecResult};
use crate::traits::Codec;

/// The default codec: JSON text.
///
/// Compact output by default, so a stored `{"foo":"bar"}` is byte-for-byte
/// what `serde_json::to_string` produces.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    /// Compact JSON.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indented JSON, easier to read in a backend dump.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Codec for JsonCodec {
    fn parse(&self, raw: &str) -> CodecResult<Value> {
        serde_json::from_str(raw).map_err(|e| CodecError::Parse(e.to_string()))
    }

    fn stringify(&self, value: &Value) -> CodecResult<String> {
        let encoded = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        encoded.map_err(|e| CodecError::Stringify(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compact_output() {
        let codec = JsonCodec::new();
        let out = codec.stringify(&json!({"foo": "bar"})).unwrap();
        assert_eq!(out, r#"{"foo":"bar"}"#);
    }

    #[test]
    fn pretty_output_parses_back() {
        let codec = JsonCodec::pretty();
        let value = json!({"nested": {"arr": [1, 2]}});
        let out = codec.stringify(&value).unwrap();
        assert!(out.contains('\n'));
        assert_eq!(codec.parse(&out).unwrap(), value);
    }

    #[test]
    fn scalars_are_valid_documents() {
        let codec = JsonCodec::new();
        assert_eq!(codec.stringify(&json!("abc")).unwrap(), "\"abc\"");
        assert_eq!(codec.parse("42").unwrap(), json!(42));
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        let err = JsonCodec::new().parse("{not json").unwrap_err();
        assert!(matches!(err, CodecError::Parse(_)));
    }
}
