//! Error types for pgfluent

use thiserror::Error;

/// Result type alias for pgfluent operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for query building and execution
#[derive(Debug, Error)]
pub enum DbError {
    /// A terminal operation ran before `table()` was called
    #[error("no table set: call table() before executing a statement")]
    NoTable,

    /// A transaction-scoped operation ran without a live transaction
    #[error("no active transaction for this operation")]
    NoTransaction,

    /// Query execution error, propagated verbatim from the driver
    #[error("query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// A query expected to yield a row yielded none
    #[error("no rows found for query `{query}`")]
    NotFound { query: String },

    /// Clean end-of-rows marker for row-at-a-time iteration.
    ///
    /// Not a failure: callers iterating with [`FromRowStream::next_row`]
    /// must match on this variant to stop.
    ///
    /// [`FromRowStream::next_row`]: crate::stream::FromRowStream::next_row
    #[error("no more rows")]
    NoMoreRows,

    /// A result column has no matching destination struct field
    #[error("column '{column}' has no matching struct field")]
    FieldNotFound { column: String },

    /// Row decode/mapping error
    #[error("decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Chunk size contract violation
    #[error("chunk size must be > 0, got {0}")]
    InvalidChunkSize(i64),

    /// Validation error
    #[error("validation error: {0}")]
    Validation(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error carrying the attempted query text
    pub fn not_found(query: impl Into<String>) -> Self {
        Self::NotFound {
            query: query.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is the end-of-rows marker
    pub fn is_no_more_rows(&self) -> bool {
        matches!(self, Self::NoMoreRows)
    }
}
