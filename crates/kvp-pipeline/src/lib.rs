//! Validate-then-modify pipeline for kvproxy stores.
//!
//! Every value that enters or leaves a store's backend passes through a
//! [`Pipeline`]: first a validator decides whether the value is acceptable,
//! then a modifier may rewrite it. A rejected value never reaches the
//! modifier, so a failed validation cannot silently change stored data.
//!
//! # Quick Start
//!
//! ```rust
//! use kvp_pipeline::{Action, Pipeline, Validity};
//! use serde_json::json;
//!
//! let pipeline = Pipeline::new()
//!     .with_validate(|value, _, _| (value["foo"] != "baz").into())
//!     .with_modify(|mut value, _, _| {
//!         value["fooIsBar"] = json!(value["foo"] == "bar");
//!         value
//!     });
//!
//! let out = pipeline.run(json!({"foo": "bar"}), Action::Set, "myObj", None).unwrap();
//! assert_eq!(out["fooIsBar"], json!(true));
//! assert!(pipeline.run(json!({"foo": "baz"}), Action::Set, "myObj", None).is_err());
//! ```

pub mod action;
pub mod error;
pub mod pipeline;
pub mod validations;
pub mod validity;

pub use action::Action;
pub use error::{BoxError, PipelineError, PipelineResult};
pub use pipeline::{ModifyFn, Pipeline, ValidateFn};
pub use validations::{keys_valid, type_name, types_valid};
pub use validity::Validity;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, thiserror::Error)]
    #[error("custom error")]
    struct CustomError;

    // -----------------------------------------------------------------------
    // 1. Empty pipeline is identity
    // -----------------------------------------------------------------------
    #[test]
    fn empty_pipeline_passes_value_through() {
        let pipeline = Pipeline::new();
        let value = json!({"foo": "bar", "count": 0});
        let out = pipeline.run(value.clone(), Action::Get, "k", None).unwrap();
        assert_eq!(out, value);
        assert!(!pipeline.has_validator());
        assert!(!pipeline.has_modifier());
    }

    // -----------------------------------------------------------------------
    // 2. Bare rejection produces the generic error per action
    // -----------------------------------------------------------------------
    #[test]
    fn generic_error_names_key_and_action() {
        let pipeline = Pipeline::new().with_validate(|_, _, _| false.into());

        let err = pipeline.run(json!({}), Action::Get, "myObj", None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation failed while parsing myObj from storage"
        );
        assert!(err.rejection().is_none());

        let err = pipeline.run(json!({}), Action::Set, "myObj", None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation failed while setting to myObj in storage"
        );
        assert!(matches!(
            err,
            PipelineError::Invalid { action: Action::Set, .. }
        ));
    }

    // -----------------------------------------------------------------------
    // 3. Caller-supplied errors are surfaced verbatim
    // -----------------------------------------------------------------------
    #[test]
    fn custom_error_is_surfaced() {
        let pipeline = Pipeline::new().with_validate(|value, _, _| {
            if value["foo"] == "baz" {
                Validity::reject(CustomError)
            } else {
                Validity::Valid
            }
        });

        assert!(pipeline.run(json!({"foo": "abc"}), Action::Set, "k", None).is_ok());
        let err = pipeline
            .run(json!({"foo": "baz"}), Action::Set, "k", None)
            .unwrap_err();
        assert_eq!(err.to_string(), "custom error");
        assert!(err.rejection().unwrap().downcast_ref::<CustomError>().is_some());
    }

    // -----------------------------------------------------------------------
    // 4. Modifier never runs on a rejected value
    // -----------------------------------------------------------------------
    #[test]
    fn modifier_skipped_on_rejection() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pipeline = Pipeline::new()
            .with_validate(|_, _, _| Validity::invalid())
            .with_modify(move |v, _, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                v
            });

        assert!(pipeline.run(json!(1), Action::Set, "k", None).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    // -----------------------------------------------------------------------
    // 5. Callbacks see the action and the field key
    // -----------------------------------------------------------------------
    #[test]
    fn callbacks_receive_action_and_field() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let pipeline = Pipeline::new().with_modify(move |mut value, action, field| {
            log.lock().unwrap().push((action, field.map(str::to_string)));
            if action == Action::Set {
                if let Some(field) = field {
                    let suffixed = format!("{} SET", value[field].as_str().unwrap_or_default());
                    value[field] = json!(suffixed);
                }
            }
            value
        });

        let out = pipeline
            .run(json!({"foo": "bar"}), Action::Set, "foo", Some("foo"))
            .unwrap();
        assert_eq!(out, json!({"foo": "bar SET"}));

        let out = pipeline
            .run(json!({"foo": "bar"}), Action::Get, "foo", Some("foo"))
            .unwrap();
        assert_eq!(out, json!({"foo": "bar"}));

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (Action::Set, Some("foo".to_string())),
                (Action::Get, Some("foo".to_string())),
            ]
        );
    }

    // -----------------------------------------------------------------------
    // 6. Validation helpers compose into a validator
    // -----------------------------------------------------------------------
    #[test]
    fn helpers_compose() {
        let pipeline = Pipeline::new().with_validate(|value, _, _| {
            (keys_valid(value, &["foo"]) && types_valid(value, &[("foo", "string")])).into()
        });
        assert!(pipeline.run(json!({"foo": "x"}), Action::Set, "k", None).is_ok());
        assert!(pipeline.run(json!({"foo": 1}), Action::Set, "k", None).is_err());
        assert!(pipeline
            .run(json!({"foo": "x", "abc": 1}), Action::Set, "k", None)
            .is_err());
    }

    #[test]
    fn action_display_and_serde() {
        assert_eq!(Action::Get.to_string(), "get");
        assert_eq!(serde_json::to_string(&Action::Set).unwrap(), "\"set\"");
        let parsed: Action = serde_json::from_str("\"get\"").unwrap();
        assert_eq!(parsed, Action::Get);
    }

    #[test]
    fn debug_hides_closures() {
        let pipeline = Pipeline::new().with_modify(|v, _, _| v);
        let rendered = format!("{pipeline:?}");
        assert!(rendered.contains("<fn>"));
    }
}
