//! Reusable predicates for validator callbacks.
//!
//! Both return `bool` and compose into a [`Validity`](crate::Validity) via
//! `.into()`:
//!
//! ```rust
//! use kvp_pipeline::{keys_valid, types_valid, Pipeline, Validity};
//!
//! let pipeline = Pipeline::new().with_validate(|value, _, _| {
//!     (keys_valid(value, &["name", "age"])
//!         && types_valid(value, &[("name", "string"), ("age", "number")]))
//!     .into()
//! });
//! # let _ = pipeline;
//! ```

use serde_json::Value;

/// Type tag of a value, in the vocabulary of dynamic-language `typeof`.
///
/// Strings are `"string"`, numbers `"number"`, booleans `"boolean"`; objects,
/// arrays and `null` are all `"object"`.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null | Value::Array(_) | Value::Object(_) => "object",
    }
}

/// `true` iff `value` is an object whose keys are exactly `required`.
///
/// Extra keys and missing keys both fail. Non-objects always fail.
pub fn keys_valid(value: &Value, required: &[&str]) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    object.keys().all(|k| required.contains(&k.as_str()))
        && required.iter().all(|k| object.contains_key(*k))
}

/// `true` iff every key of `value` has the type named for it in `types`.
///
/// A key with no entry in `types` fails, as does a non-object `value`.
pub fn types_valid(value: &Value, types: &[(&str, &str)]) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    object.iter().all(|(key, v)| {
        types
            .iter()
            .find(|(name, _)| *name == key)
            .is_some_and(|(_, expected)| *expected == type_name(v))
    })
}
