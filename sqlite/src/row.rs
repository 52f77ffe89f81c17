//! Owned rows and typed column access.
//!
//! A [`Row`] is an ordered mapping from column name to [`Value`], detached
//! from any statement so it can be handed to the hydrator (or built by hand
//! in tests). The typed accessors turn a missing column or an unexpected
//! type into [`StoreError::MalformedRow`] instead of a silent null.
//!
//! # Example
//!
//! ```
//! use student_registry_sqlite::{Row, Value};
//!
//! let row = Row::new()
//!     .with("id", 1)
//!     .with("name", "Ana")
//!     .with("phone_id", Value::Null);
//!
//! assert_eq!(row.require_i64("id").unwrap(), 1);
//! assert_eq!(row.require_text("name").unwrap(), "Ana");
//! assert_eq!(row.optional_i64("phone_id").unwrap(), None);
//! assert!(row.require_text("birth_date").is_err());
//! ```

use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, ValueRef};

use crate::error::{Result, StoreError};

/// A single scalar column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            // Text that is not valid UTF-8 stays as raw bytes so typed
            // access reports it instead of rewriting it.
            ValueRef::Text(t) => match std::str::from_utf8(t) {
                Ok(text) => Value::Text(text.to_string()),
                Err(_) => Value::Blob(t.to_vec()),
            },
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

/// An ordered set of named column values returned by a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column, returning the row for chaining.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    /// Appends a column. A repeated name shadows nothing: lookups return the
    /// first column with that name.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.push((column.into(), value.into()));
    }

    /// Looks up a column by name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column names in result order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Reads a non-null integer column.
    pub fn require_i64(&self, column: &str) -> Result<i64> {
        match self.require(column)? {
            Value::Integer(i) => Ok(*i),
            other => Err(unexpected(column, "integer", other)),
        }
    }

    /// Reads a non-null text column.
    pub fn require_text(&self, column: &str) -> Result<&str> {
        match self.require(column)? {
            Value::Text(s) => Ok(s),
            other => Err(unexpected(column, "text", other)),
        }
    }

    /// Reads a column that holds text but may have been stored as an
    /// integer (e.g. a numeric area code), rendering integers in decimal.
    pub fn require_text_like(&self, column: &str) -> Result<String> {
        match self.require(column)? {
            Value::Text(s) => Ok(s.clone()),
            Value::Integer(i) => Ok(i.to_string()),
            other => Err(unexpected(column, "text", other)),
        }
    }

    /// Reads an integer column that may be absent or null.
    pub fn optional_i64(&self, column: &str) -> Result<Option<i64>> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Integer(i)) => Ok(Some(*i)),
            Some(other) => Err(unexpected(column, "integer", other)),
        }
    }

    fn require(&self, column: &str) -> Result<&Value> {
        match self.get(column) {
            None => Err(StoreError::malformed(column, "is missing")),
            Some(value) if value.is_null() => Err(StoreError::malformed(column, "is null")),
            Some(value) => Ok(value),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn unexpected(column: &str, expected: &str, found: &Value) -> StoreError {
    StoreError::malformed(
        column,
        format!("expected {expected}, found {}", found.type_name()),
    )
}
