//! Error types for the SQLite tier backend.

use cellgeo_storage::StorageError;
use sqlx_core::error::Error as SqlxError;

/// Errors specific to the SQLite tier backend.
#[derive(Debug, thiserror::Error)]
pub enum SqliteError {
    /// Database error reported by sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::error::Error),

    /// A stored row holds values that do not fit a cell key or record.
    #[error("Invalid row: {message}")]
    InvalidRow { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl SqliteError {
    /// Creates a new invalid row error.
    #[must_use]
    pub fn invalid_row(message: impl Into<String>) -> Self {
        Self::InvalidRow {
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<SqliteError> for StorageError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::Database(
                e @ (SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_)),
            ) => StorageError::connection_error(e.to_string()),
            SqliteError::Database(e) => StorageError::query_error(e.to_string()),
            SqliteError::InvalidRow { message } => StorageError::invalid_record(message),
            SqliteError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Result type alias for SQLite operations.
pub type Result<T> = std::result::Result<T, SqliteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SqliteError::config("empty path");
        assert!(err.to_string().contains("Configuration error"));

        let err = SqliteError::invalid_row("range -5");
        assert_eq!(err.to_string(), "Invalid row: range -5");
    }

    #[test]
    fn test_conversion_to_storage_error() {
        let storage_err: StorageError = SqliteError::config("test error").into();
        assert!(matches!(storage_err, StorageError::Internal { .. }));

        let storage_err: StorageError = SqliteError::invalid_row("mcc 4000").into();
        assert!(matches!(storage_err, StorageError::InvalidRecord { .. }));

        let storage_err: StorageError = SqliteError::Database(SqlxError::PoolTimedOut).into();
        assert!(matches!(storage_err, StorageError::ConnectionError { .. }));

        let storage_err: StorageError = SqliteError::Database(SqlxError::RowNotFound).into();
        assert!(matches!(storage_err, StorageError::QueryError { .. }));
    }
}
