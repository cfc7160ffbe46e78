//! Error types for resolution and reconciliation.

use cellgeo_core::CoreError;
use cellgeo_storage::{StorageError, TierId};
use thiserror::Error;

/// Why a resolution produced no answer.
///
/// Provider problems never show up here; they only move the pipeline on to
/// the next step.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The requested key is out of bounds. No lookups were made.
    #[error(transparent)]
    InvalidInput(#[from] CoreError),

    /// A tier failed while reading or writing.
    #[error("Storage failure in tier {tier} during {operation}: {source}")]
    Storage {
        tier: TierId,
        operation: &'static str,
        #[source]
        source: StorageError,
    },

    /// The resolver was assembled without a tier it needs to write into.
    #[error("Tier {0} is required but not configured")]
    MissingTier(TierId),
}

impl ResolveError {
    pub fn storage(tier: TierId, operation: &'static str, source: StorageError) -> Self {
        Self::Storage {
            tier,
            operation,
            source,
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

/// Misuse of the reconciliation job.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Tier {0} is read-only and cannot be reconciled")]
    ReadOnlyTier(TierId),

    #[error("Tier {0} is not configured")]
    UnknownTier(TierId),

    #[error("Failed to enumerate tier {tier}: {source}")]
    Enumerate {
        tier: TierId,
        #[source]
        source: StorageError,
    },
}

/// Misuse of the refresh job.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Tier {0} is read-only and cannot be refreshed")]
    ReadOnlyTier(TierId),

    #[error("Tier {0} is not configured")]
    UnknownTier(TierId),

    #[error("No enabled provider caches into tier {0}")]
    NoProvider(TierId),

    #[error("Failed to enumerate tier {tier}: {source}")]
    Enumerate {
        tier: TierId,
        #[source]
        source: StorageError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResolveError::storage(
            TierId::Own,
            "store",
            StorageError::query_error("disk I/O error"),
        );
        assert_eq!(
            err.to_string(),
            "Storage failure in tier own during store: Query error: disk I/O error"
        );
        assert!(!err.is_invalid_input());

        let err: ResolveError = CoreError::invalid_cell_key("mcc", 1000, 999).into();
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("mcc"));

        assert_eq!(
            ReconcileError::ReadOnlyTier(TierId::Mozilla).to_string(),
            "Tier mozilla is read-only and cannot be reconciled"
        );
        assert_eq!(
            RefreshError::NoProvider(TierId::Own).to_string(),
            "No enabled provider caches into tier own"
        );
    }
}
