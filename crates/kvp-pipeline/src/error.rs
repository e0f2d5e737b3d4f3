use crate::action::Action;

/// Boxed caller-supplied error carried by a rejected validation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by [`Pipeline::run`](crate::Pipeline::run).
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The validator returned a bare rejection.
    #[error("{}", describe_failure(.key, .action))]
    Invalid { key: String, action: Action },

    /// The validator rejected the value with its own error.
    #[error(transparent)]
    Rejected(BoxError),
}

impl PipelineError {
    /// The caller-supplied error, if the validator provided one.
    pub fn rejection(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Rejected(err) => Some(err.as_ref()),
            Self::Invalid { .. } => None,
        }
    }
}

fn describe_failure(key: &str, action: &Action) -> String {
    match action {
        Action::Get => format!("validation failed while parsing {key} from storage"),
        Action::Set => format!("validation failed while setting to {key} in storage"),
    }
}

/// Result alias for pipeline runs.
pub type PipelineResult<T> = Result<T, PipelineError>;
