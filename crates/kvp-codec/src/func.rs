use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::CodecResult;
use crate::traits::Codec;

type ParseFn = Arc<dyn Fn(&str) -> CodecResult<Value> + Send + Sync>;
type StringifyFn = Arc<dyn Fn(&Value) -> CodecResult<String> + Send + Sync>;

/// A [`Codec`] built from a `parse` closure and a `stringify` closure.
#[derive(Clone)]
pub struct FnCodec {
    parse: ParseFn,
    stringify: StringifyFn,
}

impl FnCodec {
    pub fn new<P, S>(parse: P, stringify: S) -> Self
    where
        P: Fn(&str) -> CodecResult<Value> + Send + Sync + 'static,
        S: Fn(&Value) -> CodecResult<String> + Send + Sync + 'static,
    {
        Self {
            parse: Arc::new(parse),
            stringify: Arc::new(stringify),
        }
    }
}

impl Codec for FnCodec {
    fn parse(&self, raw: &str) -> CodecResult<Value> {
        (self.parse)(raw)
    }

    fn stringify(&self, value: &Value) -> CodecResult<String> {
        (self.stringify)(value)
    }
}

impl fmt::Debug for FnCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCodec").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;
    use serde_json::json;

    /// Stores strings raw instead of quoting them.
    fn raw_strings() -> FnCodec {
        FnCodec::new(
            |raw| Ok(Value::String(raw.to_string())),
            |value| match value {
                Value::String(s) => Ok(s.clone()),
                other => Err(CodecError::custom(format!("not a string: {other}"))),
            },
        )
    }

    #[test]
    fn custom_encoding() {
        let codec = raw_strings();
        assert_eq!(codec.stringify(&json!("abc")).unwrap(), "abc");
        assert_eq!(codec.parse("abc").unwrap(), json!("abc"));
    }

    #[test]
    fn custom_errors_surface() {
        let err = raw_strings().stringify(&json!(1)).unwrap_err();
        assert_eq!(err.to_string(), "not a string: 1");
    }
}
