//! Nested write propagation.
//!
//! Reading a field whose value is an object or array hands back a
//! [`Nested`] handle instead of a detached copy. Writes through the handle
//! (at any depth) mutate the shared child value and then replay the owning
//! store's own write for the top-level field, so the whole backend entry is
//! re-validated and re-persisted exactly once per nested write.
//!
//! Handles are created lazily on each read and hold no backend state: a
//! handle is the owner, the top-level field name, a path below it, and the
//! child value shared by every handle derived from the same read.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

// ---------------------------------------------------------------------------
// FieldWriter
// ---------------------------------------------------------------------------

/// The write path a nested handle relays to.
///
/// Implemented by both store kinds; `write_field` is the same operation as
/// the store's own `set`.
pub trait FieldWriter {
    fn write_field(&self, field: &str, value: Value) -> StoreResult<()>;
}

// ---------------------------------------------------------------------------
// PathSegment
// ---------------------------------------------------------------------------

/// One step below a top-level field: an object key or an array index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "key '{key}'"),
            Self::Index(index) => write!(f, "index {index}"),
        }
    }
}

fn render_path(field: &str, path: &[PathSegment]) -> String {
    let mut out = field.to_string();
    for segment in path {
        match segment {
            PathSegment::Key(key) => {
                out.push('.');
                out.push_str(key);
            }
            PathSegment::Index(index) => out.push_str(&format!("[{index}]")),
        }
    }
    out
}

/// Whether a value gets wrapped in a [`Nested`] handle when read.
pub fn is_nestable(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

/// The result of reading a field from a store or a nested handle.
pub enum Field<'s> {
    /// A leaf value (string, number, bool or null).
    Value(Value),
    /// An object or array, writable in place.
    Nested(Nested<'s>),
    /// Nothing is stored for this field.
    Missing,
}

impl<'s> Field<'s> {
    /// Wrap a resolved top-level value read from `owner`.
    ///
    /// Never writes to the backend.
    pub(crate) fn wrap(owner: &'s dyn FieldWriter, field: &str, value: Option<Value>) -> Self {
        match value {
            None => Self::Missing,
            Some(value) if is_nestable(&value) => Self::Nested(Nested {
                owner,
                field: field.to_string(),
                path: Vec::new(),
                root: Rc::new(RefCell::new(value)),
            }),
            Some(value) => Self::Value(value),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, Self::Nested(_))
    }

    /// The leaf value, if this is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// A detached copy of whatever was read.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value.clone()),
            Self::Nested(nested) => nested.value().ok(),
            Self::Missing => None,
        }
    }

    /// Consume into a detached value.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            other => other.to_value(),
        }
    }

    /// The nested handle, if this is one.
    pub fn into_nested(self) -> Option<Nested<'s>> {
        match self {
            Self::Nested(nested) => Some(nested),
            _ => None,
        }
    }
}

impl fmt::Debug for Field<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Nested(nested) => f.debug_tuple("Nested").field(nested).finish(),
            Self::Missing => f.write_str("Missing"),
        }
    }
}

// ---------------------------------------------------------------------------
// Nested
// ---------------------------------------------------------------------------

/// A writable view of an object or array below a store field.
pub struct Nested<'s> {
    owner: &'s dyn FieldWriter,
    field: String,
    path: Vec<PathSegment>,
    root: Rc<RefCell<Value>>,
}

impl<'s> Nested<'s> {
    /// The top-level field this handle writes through.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Path from the top-level field to this handle's value.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    fn location(&self) -> String {
        render_path(&self.field, &self.path)
    }

    fn not_found(&self) -> StoreError {
        StoreError::PathNotFound {
            path: self.location(),
        }
    }

    /// A detached copy of this handle's current value.
    pub fn value(&self) -> StoreResult<Value> {
        let root = self.root.borrow();
        resolve(&root, &self.path)
            .cloned()
            .ok_or_else(|| self.not_found())
    }

    pub fn is_array(&self) -> bool {
        let root = self.root.borrow();
        resolve(&root, &self.path).is_some_and(Value::is_array)
    }

    pub fn is_object(&self) -> bool {
        let root = self.root.borrow();
        resolve(&root, &self.path).is_some_and(Value::is_object)
    }

    /// Number of entries (object keys or array elements).
    pub fn len(&self) -> usize {
        let root = self.root.borrow();
        match resolve(&root, &self.path) {
            Some(Value::Object(map)) => map.len(),
            Some(Value::Array(items)) => items.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Object keys, in stored order. Empty for arrays.
    pub fn keys(&self) -> Vec<String> {
        let root = self.root.borrow();
        match resolve(&root, &self.path) {
            Some(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Read one entry, wrapping it again if it is itself nestable.
    pub fn get(&self, segment: impl Into<PathSegment>) -> StoreResult<Field<'s>> {
        let segment = segment.into();
        let root = self.root.borrow();
        let node = resolve(&root, &self.path).ok_or_else(|| self.not_found())?;
        let child = match lookup(node, &segment, || self.location())? {
            None => return Ok(Field::Missing),
            Some(child) => child,
        };

        if is_nestable(child) {
            let mut path = self.path.clone();
            path.push(segment);
            Ok(Field::Nested(Nested {
                owner: self.owner,
                field: self.field.clone(),
                path,
                root: Rc::clone(&self.root),
            }))
        } else {
            Ok(Field::Value(child.clone()))
        }
    }

    /// Read one entry as a detached value.
    pub fn get_value(&self, segment: impl Into<PathSegment>) -> StoreResult<Option<Value>> {
        Ok(self.get(segment)?.into_value())
    }

    /// Write one entry, then persist the whole top-level field.
    ///
    /// Writing array index `len` appends. If the owner rejects the write the
    /// shared child value is rolled back.
    pub fn set(&self, segment: impl Into<PathSegment>, value: Value) -> StoreResult<()> {
        let segment = segment.into();
        let location = self.location();
        self.mutate(|node| assign(node, &segment, value, &location))
    }

    /// Append to an array, then persist the whole top-level field.
    pub fn push(&self, value: Value) -> StoreResult<()> {
        let location = self.location();
        self.mutate(|node| match node {
            Value::Array(items) => {
                items.push(value);
                Ok(())
            }
            _ => Err(StoreError::PathTypeMismatch {
                path: location.clone(),
                segment: "push".into(),
                expected: "array",
            }),
        })
    }

    fn mutate<F>(&self, apply: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Value) -> StoreResult<()>,
    {
        let (previous, updated) = {
            let mut root = self.root.borrow_mut();
            let previous = root.clone();
            let node = resolve_mut(&mut *root, &self.path).ok_or_else(|| self.not_found())?;
            apply(node)?;
            (previous, root.clone())
        };

        debug!(field = %self.field, path = %self.location(), "relaying nested write to owner");
        if let Err(err) = self.owner.write_field(&self.field, updated) {
            *self.root.borrow_mut() = previous;
            return Err(err);
        }
        Ok(())
    }
}

impl fmt::Debug for Nested<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Nested")
            .field("field", &self.field)
            .field("path", &self.path)
            .field("value", &self.value().ok())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn resolve<'v>(root: &'v Value, path: &[PathSegment]) -> Option<&'v Value> {
    path.iter().try_fold(root, |node, segment| match segment {
        PathSegment::Key(key) => node.as_object()?.get(key),
        PathSegment::Index(index) => node.as_array()?.get(*index),
    })
}

fn resolve_mut<'v>(root: &'v mut Value, path: &[PathSegment]) -> Option<&'v mut Value> {
    path.iter().try_fold(root, |node, segment| match segment {
        PathSegment::Key(key) => node.as_object_mut()?.get_mut(key),
        PathSegment::Index(index) => node.as_array_mut()?.get_mut(*index),
    })
}

fn lookup<'v>(
    node: &'v Value,
    segment: &PathSegment,
    location: impl FnOnce() -> String,
) -> StoreResult<Option<&'v Value>> {
    match (node, segment) {
        (Value::Object(map), PathSegment::Key(key)) => Ok(map.get(key)),
        (Value::Array(items), PathSegment::Index(index)) => Ok(items.get(*index)),
        (Value::Object(_), _) => Err(mismatch(location(), segment, "key")),
        (Value::Array(_), _) => Err(mismatch(location(), segment, "index")),
        _ => Err(mismatch(location(), segment, "object or array")),
    }
}

fn assign(node: &mut Value, segment: &PathSegment, value: Value, location: &str) -> StoreResult<()> {
    match (node, segment) {
        (Value::Object(map), PathSegment::Key(key)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (Value::Array(items), PathSegment::Index(index)) => {
            let len = items.len();
            if *index < len {
                items[*index] = value;
                Ok(())
            } else if *index == len {
                items.push(value);
                Ok(())
            } else {
                Err(StoreError::IndexOutOfBounds {
                    path: location.to_string(),
                    index: *index,
                    len,
                })
            }
        }
        (Value::Object(_), _) => Err(mismatch(location.to_string(), segment, "key")),
        (Value::Array(_), _) => Err(mismatch(location.to_string(), segment, "index")),
        _ => Err(mismatch(location.to_string(), segment, "object or array")),
    }
}

fn mismatch(path: String, segment: &PathSegment, expected: &'static str) -> StoreError {
    StoreError::PathTypeMismatch {
        path,
        segment: segment.to_string(),
        expected,
    }
}
