//! Error types for state store operations.

use thiserror::Error;

/// Errors that can occur during state store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Remote metadata carried a creation timestamp that is not ISO-8601.
    #[error("invalid creation timestamp '{value}' for item {id}: {source}")]
    InvalidTimestamp {
        /// Item identity whose timestamp failed to parse.
        id: String,
        /// The raw timestamp string.
        value: String,
        /// The underlying parse error.
        #[source]
        source: chrono::ParseError,
    },

    /// No item exists with the given identity.
    #[error("item not found: {0}")]
    ItemNotFound(String),
}
