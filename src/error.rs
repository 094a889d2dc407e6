//! Error types for rowstack
//!
//! Provides the error taxonomy for connection management, query execution,
//! schema lookups, and transaction control, plus the explicit outcome type
//! used by mutating verbs.

use thiserror::Error;

/// Result type alias for ORM operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for ORM operations
#[derive(Debug, Clone, Error)]
pub enum OrmError {
    /// Cannot establish or re-establish the database link
    #[error("connection error: {0}")]
    Connection(String),
    /// Statement execution failure (an implicit rollback has already been attempted)
    #[error("query error: {0}")]
    Query(String),
    /// Unknown field reference, duplicate field, or malformed DDL descriptor
    #[error("schema error: {0}")]
    Schema(String),
    /// Transaction bookkeeping failure (nested begin, commit without begin)
    #[error("transaction error: {0}")]
    Transaction(String),
    /// JSON field encoding failure
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl OrmError {
    /// Execution failure; the message carries the statement that failed
    pub fn query_failed(statement: &str, err: &sqlx::Error) -> Self {
        OrmError::Query(format!("{} (statement: {})", err, statement))
    }
}

impl From<sqlx::Error> for OrmError {
    fn from(err: sqlx::Error) -> Self {
        OrmError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        OrmError::Serialization(err.to_string())
    }
}

/// Outcome of a mutating verb.
///
/// "Zero rows matched" is an expected business outcome, not an error, so
/// `insert`/`update`/`delete` report it as [`Affected::NoMatch`] instead of
/// collapsing it into a failure. Genuine backend failures surface as
/// [`OrmError::Query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affected {
    /// The statement changed this many rows (always non-zero)
    Rows(u64),
    /// The statement matched no rows, or there was nothing to write
    NoMatch,
}

impl Affected {
    /// Build an outcome from a raw affected-row count
    pub fn from_count(count: u64) -> Self {
        if count == 0 {
            Affected::NoMatch
        } else {
            Affected::Rows(count)
        }
    }

    /// Whether any row was changed
    pub fn is_applied(&self) -> bool {
        matches!(self, Affected::Rows(_))
    }

    /// Number of rows changed (zero for `NoMatch`)
    pub fn rows(&self) -> u64 {
        match self {
            Affected::Rows(count) => *count,
            Affected::NoMatch => 0,
        }
    }
}
