use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::action::Action;
use crate::error::{PipelineError, PipelineResult};
use crate::validity::Validity;

/// Validator callback: `(value, action, field key)`.
///
/// The field key is `Some` for per-field stores and `None` for whole-object
/// stores.
pub type ValidateFn = Arc<dyn Fn(&Value, Action, Option<&str>) -> Validity + Send + Sync>;

/// Modifier callback: `(value, action, field key)`, returning the value to
/// persist (on `set`) or to hand to the caller (on `get`).
pub type ModifyFn = Arc<dyn Fn(Value, Action, Option<&str>) -> Value + Send + Sync>;

/// The validate-then-modify sequence every stored value passes through.
///
/// Validation is a gate: it can only accept or reject and never changes the
/// value. Modification runs only on accepted values and is assumed to produce
/// a valid result. An empty pipeline accepts everything and changes nothing.
#[derive(Clone, Default)]
pub struct Pipeline {
    validate: Option<ValidateFn>,
    modify: Option<ModifyFn>,
}

impl Pipeline {
    /// An accept-all, identity pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the validator.
    pub fn with_validate<F>(mut self, validate: F) -> Self
    where
        F: Fn(&Value, Action, Option<&str>) -> Validity + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(validate));
        self
    }

    /// Replace the modifier.
    pub fn with_modify<F>(mut self, modify: F) -> Self
    where
        F: Fn(Value, Action, Option<&str>) -> Value + Send + Sync + 'static,
    {
        self.modify = Some(Arc::new(modify));
        self
    }

    /// Whether a validator is installed.
    pub fn has_validator(&self) -> bool {
        self.validate.is_some()
    }

    /// Whether a modifier is installed.
    pub fn has_modifier(&self) -> bool {
        self.modify.is_some()
    }

    /// Run `value` through validation and then modification.
    ///
    /// `storage_key` names the backend key in the generic error; `field` is
    /// forwarded to both callbacks. A rejection stops the run before the
    /// modifier is called.
    pub fn run(
        &self,
        value: Value,
        action: Action,
        storage_key: &str,
        field: Option<&str>,
    ) -> PipelineResult<Value> {
        if let Some(validate) = &self.validate {
            if let Validity::Invalid(err) = validate(&value, action, field) {
                debug!(key = storage_key, %action, custom = err.is_some(), "validation rejected value");
                return Err(match err {
                    Some(err) => PipelineError::Rejected(err),
                    None => PipelineError::Invalid {
                        key: storage_key.to_string(),
                        action,
                    },
                });
            }
        }

        Ok(match &self.modify {
            Some(modify) => modify(value, action, field),
            None => value,
        })
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("validate", &self.validate.as_ref().map(|_| "<fn>"))
            .field("modify", &self.modify.as_ref().map(|_| "<fn>"))
            .finish()
    }
}
