use thiserror::Error;

/// Errors raised while encoding or decoding stored values.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The stored string could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// The value could not be encoded.
    #[error("stringify error: {0}")]
    Stringify(String),

    /// Failure reported by a caller-supplied codec.
    #[error("{0}")]
    Custom(String),
}

impl CodecError {
    /// Wrap an arbitrary message as a codec failure.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
