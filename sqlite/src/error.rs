//! Error types for student storage operations.
//!
//! Provides a unified error type covering connection failures, malformed
//! rows, precondition violations, and migration failures.

use student_registry_core::AggregateError;
use thiserror::Error;

/// Errors that can occur while reading or writing student aggregates.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store was unreachable or rejected the statement.
    #[error("database error: {0}")]
    ConnectionError(#[from] rusqlite::Error),

    /// A returned row is missing a column or carries an unusable value.
    #[error("malformed row: column '{column}' {reason}")]
    MalformedRow {
        /// Name of the offending column.
        column: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The caller asked for something the entity's state does not allow,
    /// such as removing a student that was never persisted.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Attaching a phone would break the aggregate's invariants.
    #[error("aggregate error: {0}")]
    AggregateError(#[from] AggregateError),

    /// Migration lifecycle operation failure.
    #[error("migration error: {0}")]
    MigrationError(String),

    /// A seed fixture could not be parsed.
    #[error("fixture error: {0}")]
    FixtureError(#[from] serde_json::Error),

    /// A seed fixture could not be read.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn malformed(column: &str, reason: impl Into<String>) -> Self {
        StoreError::MalformedRow {
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
