//! Error types for backend operations.

use thiserror::Error;

/// Errors raised by a [`Backend`](crate::Backend).
#[derive(Debug, Error)]
pub enum BackendError {
    /// I/O error from a file-based backend.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend's own on-disk representation could not be read or written.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A lock guarding backend state was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// Failure reported by a caller-supplied backend.
    #[error("{0}")]
    Custom(String),
}

impl BackendError {
    /// Wrap an arbitrary message as a backend failure.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// Convenience type alias for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;
