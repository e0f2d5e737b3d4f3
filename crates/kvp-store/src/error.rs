use kvp_backend::BackendError;
use kvp_codec::CodecError;
use kvp_pipeline::PipelineError;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A value failed validation (generic or caller-supplied error).
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The backend failed to read or write.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// A stored string could not be decoded, or a value could not be encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A value that must be an object (defaults, a stored blob, a pipeline
    /// result) was something else.
    #[error("value for {key} is not an object")]
    NotAnObject { key: String },

    /// A write targeted a field that was never declared in the defaults.
    #[error("{field} was not passed in defaults object")]
    UndeclaredField { field: String },

    /// A nested handle's path no longer resolves to a value.
    #[error("no value at {path}")]
    PathNotFound { path: String },

    /// A key was used on an array, an index on an object, or a push on an
    /// object.
    #[error("cannot address {segment} at {path}: expected {expected}")]
    PathTypeMismatch {
        path: String,
        segment: String,
        expected: &'static str,
    },

    /// An array write landed past the end of the array.
    #[error("index {index} out of bounds for array of length {len} at {path}")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },

    /// The live object's lock was poisoned by a panicking callback.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    /// Returns `true` for validation failures of either kind.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Pipeline(_))
    }

    /// The caller-supplied validation error, downcast to `E`.
    pub fn rejection<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Pipeline(err) => err.rejection()?.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
