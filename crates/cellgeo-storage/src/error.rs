//! Storage error types for the cache tier abstraction.
//!
//! A storage error always means the backing store misbehaved. A missing key is
//! never an error; lookups report it as `Ok(None)`.

use std::fmt;

use crate::tier::TierId;

/// Errors that can occur during tier operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A write or delete was attempted on a read-only tier.
    #[error("Tier {tier} is read-only")]
    ReadOnly {
        /// The tier that rejected the write.
        tier: TierId,
    },

    /// Failed to connect to or open the backing store.
    #[error("Connection error: {message}")]
    ConnectionError {
        /// Description of the connection error.
        message: String,
    },

    /// A query against the backing store failed.
    #[error("Query error: {message}")]
    QueryError {
        /// Description of the failed query.
        message: String,
    },

    /// A stored row could not be turned into a record.
    #[error("Invalid record: {message}")]
    InvalidRecord {
        /// Description of why the row is invalid.
        message: String,
    },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `ReadOnly` error.
    #[must_use]
    pub fn read_only(tier: TierId) -> Self {
        Self::ReadOnly { tier }
    }

    /// Creates a new `ConnectionError` error.
    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    /// Creates a new `QueryError` error.
    #[must_use]
    pub fn query_error(message: impl Into<String>) -> Self {
        Self::QueryError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidRecord` error.
    #[must_use]
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a read-only violation.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ReadOnly { .. } => ErrorCategory::Misuse,
            Self::ConnectionError { .. } => ErrorCategory::Infrastructure,
            Self::QueryError { .. } => ErrorCategory::Infrastructure,
            Self::InvalidRecord { .. } => ErrorCategory::Corruption,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Operation not permitted on this tier.
    Misuse,
    /// Infrastructure/connection error.
    Infrastructure,
    /// Stored data is malformed.
    Corruption,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Misuse => write!(f, "misuse"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Corruption => write!(f, "corruption"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
