//! In-memory cache tier backed by `dashmap`.

use std::sync::Arc;

use async_trait::async_trait;
use cellgeo_core::{AreaKey, CellKey, LocationRecord, now_utc};
use dashmap::DashMap;
use time::OffsetDateTime;

use crate::error::StorageError;
use crate::tier::{TierAccess, TierId};
use crate::traits::CacheTier;

/// Cache tier held entirely in process memory.
///
/// This tier provides:
/// - Sharded concurrent access via `dashmap`
/// - Upsert semantics that keep the original `created_at`
/// - Optional read-only mode for standing in for external datasets
#[derive(Debug, Clone)]
pub struct InMemoryTier {
    id: TierId,
    access: TierAccess,
    data: Arc<DashMap<CellKey, LocationRecord>>,
}

impl InMemoryTier {
    /// Creates an empty tier with the default access of `id`.
    pub fn new(id: TierId) -> Self {
        Self {
            id,
            access: id.access(),
            data: Arc::new(DashMap::new()),
        }
    }

    /// Creates a read-only tier pre-populated with `records`.
    ///
    /// Used to stand in for the external datasets when no database file is
    /// configured.
    pub fn read_only_with(
        id: TierId,
        records: impl IntoIterator<Item = (CellKey, LocationRecord)>,
    ) -> Self {
        let data = DashMap::new();
        for (key, record) in records {
            data.insert(key, record);
        }
        Self {
            id,
            access: TierAccess::ReadOnly,
            data: Arc::new(data),
        }
    }

    /// Inserts a record regardless of access mode.
    pub fn seed(&self, key: CellKey, record: LocationRecord) {
        self.data.insert(key, record);
    }

    fn ensure_writable(&self) -> Result<(), StorageError> {
        match self.access {
            TierAccess::ReadWrite => Ok(()),
            TierAccess::ReadOnly => Err(StorageError::read_only(self.id)),
        }
    }
}

#[async_trait]
impl CacheTier for InMemoryTier {
    fn id(&self) -> TierId {
        self.id
    }

    fn access(&self) -> TierAccess {
        self.access
    }

    async fn lookup(&self, key: &CellKey) -> Result<Option<LocationRecord>, StorageError> {
        Ok(self.data.get(key).map(|entry| *entry.value()))
    }

    async fn store(&self, key: &CellKey, record: &LocationRecord) -> Result<(), StorageError> {
        self.ensure_writable()?;
        let now = now_utc();
        self.data
            .entry(*key)
            .and_modify(|existing| {
                let created_at = existing.created_at;
                *existing = record.stamped(now);
                existing.created_at = created_at.or(Some(now));
            })
            .or_insert_with(|| record.stamped(now));
        tracing::trace!(tier = %self.id, key = %key, range = record.range, "stored record");
        Ok(())
    }

    async fn delete(&self, key: &CellKey) -> Result<bool, StorageError> {
        self.ensure_writable()?;
        Ok(self.data.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<CellKey>, StorageError> {
        let mut keys: Vec<CellKey> = self.data.iter().map(|entry| *entry.key()).collect();
        keys.sort_unstable();
        Ok(keys)
    }

    async fn stale_keys(&self, cutoff: OffsetDateTime) -> Result<Vec<CellKey>, StorageError> {
        let mut keys: Vec<CellKey> = self
            .data
            .iter()
            .filter(|entry| entry.value().updated_at.is_none_or(|at| at < cutoff))
            .map(|entry| *entry.key())
            .collect();
        keys.sort_unstable();
        Ok(keys)
    }

    async fn area_records(&self, area: &AreaKey) -> Result<Vec<LocationRecord>, StorageError> {
        Ok(self
            .data
            .iter()
            .filter(|entry| area.contains(entry.key()))
            .map(|entry| *entry.value())
            .collect())
    }

    async fn len(&self) -> Result<u64, StorageError> {
        Ok(self.data.len() as u64)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
