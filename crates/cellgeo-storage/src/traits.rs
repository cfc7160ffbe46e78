//! The cache tier trait every backing store implements.

use async_trait::async_trait;
use cellgeo_core::{AreaKey, CellKey, LocationRecord};
use time::OffsetDateTime;

use crate::error::StorageError;
use crate::tier::{TierAccess, TierId};

/// One ranked key → record store consulted during resolution.
///
/// Implementations must be thread-safe (`Send + Sync`) and serialize their own
/// writes; callers perform no locking. Writing an existing key overwrites it.
///
/// # Example
///
/// ```ignore
/// use cellgeo_storage::{CacheTier, StorageError};
///
/// async fn known(tier: &dyn CacheTier, key: &CellKey) -> Result<bool, StorageError> {
///     Ok(tier.lookup(key).await?.is_some())
/// }
/// ```
#[async_trait]
pub trait CacheTier: Send + Sync {
    /// Which of the five stores this is.
    fn id(&self) -> TierId;

    /// Whether writes are accepted. Defaults to the access of [`TierId`].
    fn access(&self) -> TierAccess {
        self.id().access()
    }

    /// Reads the record for `key`.
    ///
    /// Returns `None` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error only for storage-layer failures, never for a missing key.
    async fn lookup(&self, key: &CellKey) -> Result<Option<LocationRecord>, StorageError>;

    /// Writes `record` under `key`, replacing any existing record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ReadOnly` on read-only tiers.
    async fn store(&self, key: &CellKey, record: &LocationRecord) -> Result<(), StorageError>;

    /// Removes `key`. Returns whether a record was present.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ReadOnly` on read-only tiers.
    async fn delete(&self, key: &CellKey) -> Result<bool, StorageError>;

    /// Every key held by this tier.
    async fn keys(&self) -> Result<Vec<CellKey>, StorageError>;

    /// Keys whose record was last written before `cutoff`, or never stamped.
    ///
    /// The default walks [`keys`](Self::keys) and reads each record; backends
    /// with an index on `updated_at` should override it.
    async fn stale_keys(&self, cutoff: OffsetDateTime) -> Result<Vec<CellKey>, StorageError> {
        let mut stale = Vec::new();
        for key in self.keys().await? {
            if let Some(record) = self.lookup(&key).await?
                && record.updated_at.is_none_or(|at| at < cutoff)
            {
                stale.push(key);
            }
        }
        Ok(stale)
    }

    /// Every record belonging to one location area.
    async fn area_records(&self, area: &AreaKey) -> Result<Vec<LocationRecord>, StorageError>;

    /// Number of records held.
    async fn len(&self) -> Result<u64, StorageError>;

    /// Returns the name of the backend for logging/debugging.
    fn backend_name(&self) -> &'static str;

    /// Last modification time of the underlying dataset, if it is a file.
    fn source_modified(&self) -> Option<OffsetDateTime> {
        None
    }
}
