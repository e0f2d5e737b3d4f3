use crate::error::BoxError;

/// The outcome of a validator callback.
#[derive(Debug)]
pub enum Validity {
    /// The value may proceed to the modify step.
    Valid,
    /// The value is rejected.
    ///
    /// `None` raises the pipeline's generic error naming the storage key and
    /// action; `Some` raises the supplied error unchanged.
    Invalid(Option<BoxError>),
}

impl Validity {
    /// Reject with the generic error.
    pub fn invalid() -> Self {
        Self::Invalid(None)
    }

    /// Reject with a caller-supplied error.
    pub fn reject(err: impl Into<BoxError>) -> Self {
        Self::Invalid(Some(err.into()))
    }

    /// Returns `true` if the value was accepted.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl From<bool> for Validity {
    fn from(valid: bool) -> Self {
        if valid {
            Self::Valid
        } else {
            Self::Invalid(None)
        }
    }
}
