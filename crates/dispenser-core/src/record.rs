//! Records and row normalisation
//!
//! A [`Record`] is an ordered mapping from field name to a dynamically typed
//! value. serde_json is built with `preserve_order`, so iteration order is the
//! order in which fields were decoded.

use serde_json::Value;

/// One ordered key-value unit of output data
pub type Record = serde_json::Map<String, Value>;

/// Split a decoded payload into its rows.
///
/// A list yields one row per element, a `null` document yields nothing and
/// anything else is a single row.
pub(crate) fn rows(value: Value) -> RowIter {
    match value {
        Value::Array(items) => RowIter::Many(items.into_iter()),
        Value::Null => RowIter::Many(Vec::new().into_iter()),
        other => RowIter::One(Some(other)),
    }
}

pub(crate) enum RowIter {
    One(Option<Value>),
    Many(std::vec::IntoIter<Value>),
}

impl Iterator for RowIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            Self::One(value) => value.take(),
            Self::Many(items) => items.next(),
        }
    }
}

/// Convert a single row into a record; non-mapping rows are rejected.
pub(crate) fn into_record(value: Value) -> Result<Record, String> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(format!("row is {}, expected a mapping", kind_of(&other))),
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
