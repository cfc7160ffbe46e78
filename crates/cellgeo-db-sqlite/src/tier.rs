//! `CacheTier` implementation over a SQLite `cells` table.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cellgeo_core::{AreaKey, CellKey, CellQuery, LocationRecord, now_utc};
use cellgeo_storage::{CacheTier, StorageError, TierAccess, TierId};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_sqlite::SqlitePool;
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};

use crate::config::SqliteConfig;
use crate::error::{Result, SqliteError};
use crate::pool::create_pool;
use crate::schema::ensure_schema;

// External datasets are bulk-imported from CSV and may carry loose column
// affinities, so read-only tiers cast on the way out.
const LOOKUP_READ_ONLY: &str = "\
SELECT CAST(lat AS REAL), CAST(lon AS REAL), CAST(range AS INTEGER) \
FROM cells WHERE mcc = ? AND mnc = ? AND lac = ? AND cellid = ?";

const LOOKUP: &str = "\
SELECT lat, lon, range, created_at, updated_at \
FROM cells WHERE mcc = ? AND mnc = ? AND lac = ? AND cellid = ?";

const AREA: &str = "\
SELECT CAST(lat AS REAL), CAST(lon AS REAL), CAST(range AS INTEGER) \
FROM cells WHERE mcc = ? AND mnc = ? AND lac = ?";

const UPSERT: &str = "\
INSERT INTO cells (mcc, mnc, lac, cellid, lat, lon, range, created_at, updated_at) \
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
ON CONFLICT (mcc, mnc, lac, cellid) DO UPDATE SET \
lat = excluded.lat, lon = excluded.lon, range = excluded.range, updated_at = excluded.updated_at";

const DELETE: &str = "DELETE FROM cells WHERE mcc = ? AND mnc = ? AND lac = ? AND cellid = ?";

const KEYS: &str = "SELECT mcc, mnc, lac, cellid FROM cells ORDER BY mcc, mnc, lac, cellid";

const STALE_KEYS: &str = "\
SELECT mcc, mnc, lac, cellid FROM cells WHERE updated_at IS NULL OR updated_at < ? \
ORDER BY mcc, mnc, lac, cellid";

const COUNT: &str = "SELECT COUNT(*) FROM cells";

type StorageResult<T> = std::result::Result<T, StorageError>;

/// One tier stored in its own SQLite file.
///
/// Read-only tiers are opened with SQLite's read-only flag regardless of the
/// configuration; writable tiers get their schema created on open.
#[derive(Debug, Clone)]
pub struct SqliteTier {
    id: TierId,
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteTier {
    /// Opens the tier `id` with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema cannot be
    /// created.
    #[instrument(skip(config), fields(tier = %id))]
    pub async fn open(id: TierId, config: SqliteConfig) -> Result<Self> {
        let config = if id.is_read_only() {
            config.with_read_only(true)
        } else {
            config
        };

        let pool = create_pool(&config).await?;
        if !config.read_only {
            ensure_schema(&pool).await?;
        }

        debug!(path = %config.path.display(), "tier opened");
        Ok(Self {
            id,
            pool,
            path: config.path,
        })
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn keys_from_rows(&self, rows: Vec<(i64, i64, i64, i64)>) -> Vec<CellKey> {
        let mut keys = Vec::with_capacity(rows.len());
        for (mcc, mnc, lac, cellid) in rows {
            match CellQuery::new(mcc, mnc, lac, cellid).validate() {
                Ok(key) => keys.push(key),
                Err(e) => warn!(tier = %self.id, error = %e, "skipping row with invalid key"),
            }
        }
        keys
    }

    fn ensure_writable(&self) -> StorageResult<()> {
        if self.id.is_read_only() {
            return Err(StorageError::read_only(self.id));
        }
        Ok(())
    }
}

fn key_params(key: &CellKey) -> [i64; 4] {
    [
        i64::from(key.mcc()),
        i64::from(key.mnc()),
        i64::from(key.lac()),
        i64::from(key.cell_id()),
    ]
}

fn range_from_row(range: i64) -> Result<u32> {
    u32::try_from(range).map_err(|_| SqliteError::invalid_row(format!("range {range}")))
}

fn timestamp(secs: Option<i64>) -> Option<OffsetDateTime> {
    secs.and_then(|s| OffsetDateTime::from_unix_timestamp(s).ok())
}

#[async_trait]
impl CacheTier for SqliteTier {
    fn id(&self) -> TierId {
        self.id
    }

    fn access(&self) -> TierAccess {
        self.id.access()
    }

    async fn lookup(&self, key: &CellKey) -> StorageResult<Option<LocationRecord>> {
        let [mcc, mnc, lac, cellid] = key_params(key);

        if self.id.is_read_only() {
            let row: Option<(f64, f64, i64)> = query_as(LOOKUP_READ_ONLY)
                .bind(mcc)
                .bind(mnc)
                .bind(lac)
                .bind(cellid)
                .fetch_optional(&self.pool)
                .await
                .map_err(SqliteError::from)?;

            return match row {
                Some((lat, lon, range)) => {
                    Ok(Some(LocationRecord::new(lat, lon, range_from_row(range)?)))
                }
                None => Ok(None),
            };
        }

        let row: Option<(f64, f64, i64, Option<i64>, Option<i64>)> = query_as(LOOKUP)
            .bind(mcc)
            .bind(mnc)
            .bind(lac)
            .bind(cellid)
            .fetch_optional(&self.pool)
            .await
            .map_err(SqliteError::from)?;

        match row {
            Some((lat, lon, range, created_at, updated_at)) => {
                let mut record = LocationRecord::new(lat, lon, range_from_row(range)?);
                record.created_at = timestamp(created_at);
                record.updated_at = timestamp(updated_at);
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, key, record), fields(tier = %self.id, key = %key))]
    async fn store(&self, key: &CellKey, record: &LocationRecord) -> StorageResult<()> {
        self.ensure_writable()?;
        let [mcc, mnc, lac, cellid] = key_params(key);
        let now = now_utc().unix_timestamp();

        query(UPSERT)
            .bind(mcc)
            .bind(mnc)
            .bind(lac)
            .bind(cellid)
            .bind(record.lat)
            .bind(record.lon)
            .bind(i64::from(record.range))
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(SqliteError::from)?;

        debug!(range = record.range, "stored record");
        Ok(())
    }

    async fn delete(&self, key: &CellKey) -> StorageResult<bool> {
        self.ensure_writable()?;
        let [mcc, mnc, lac, cellid] = key_params(key);

        let result = query(DELETE)
            .bind(mcc)
            .bind(mnc)
            .bind(lac)
            .bind(cellid)
            .execute(&self.pool)
            .await
            .map_err(SqliteError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn keys(&self) -> StorageResult<Vec<CellKey>> {
        let rows: Vec<(i64, i64, i64, i64)> = query_as(KEYS)
            .fetch_all(&self.pool)
            .await
            .map_err(SqliteError::from)?;
        Ok(self.keys_from_rows(rows))
    }

    async fn stale_keys(&self, cutoff: OffsetDateTime) -> StorageResult<Vec<CellKey>> {
        let rows: Vec<(i64, i64, i64, i64)> = query_as(STALE_KEYS)
            .bind(cutoff.unix_timestamp())
            .fetch_all(&self.pool)
            .await
            .map_err(SqliteError::from)?;
        Ok(self.keys_from_rows(rows))
    }

    async fn area_records(&self, area: &AreaKey) -> StorageResult<Vec<LocationRecord>> {
        let rows: Vec<(f64, f64, i64)> = query_as(AREA)
            .bind(i64::from(area.mcc()))
            .bind(i64::from(area.mnc()))
            .bind(i64::from(area.lac()))
            .fetch_all(&self.pool)
            .await
            .map_err(SqliteError::from)?;

        let mut records = Vec::with_capacity(rows.len());
        for (lat, lon, range) in rows {
            records.push(LocationRecord::new(lat, lon, range_from_row(range)?));
        }
        Ok(records)
    }

    async fn len(&self) -> StorageResult<u64> {
        let (count,): (i64,) = query_as(COUNT)
            .fetch_one(&self.pool)
            .await
            .map_err(SqliteError::from)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn source_modified(&self) -> Option<OffsetDateTime> {
        std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
            .map(OffsetDateTime::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(lac: u32, cell: u32) -> CellKey {
        CellKey::new(228, 1, lac, cell).unwrap()
    }

    async fn writable(dir: &tempfile::TempDir, id: TierId) -> SqliteTier {
        let path = dir.path().join(format!("{id}_cells.sqlite"));
        SqliteTier::open(id, SqliteConfig::new(path)).await.unwrap()
    }

    #[tokio::test]
    async fn test_store_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let tier = writable(&dir, TierId::Glm).await;

        assert!(tier.lookup(&key(1, 1)).await.unwrap().is_none());
        tier.store(&key(1, 1), &LocationRecord::new(46.911, 7.36, 1200))
            .await
            .unwrap();

        let record = tier.lookup(&key(1, 1)).await.unwrap().unwrap();
        assert_eq!(record.lat, 46.911);
        assert_eq!(record.lon, 7.36);
        assert_eq!(record.range, 1200);
        assert!(record.created_at.is_some());
        assert_eq!(tier.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let tier = writable(&dir, TierId::Own).await;

        tier.store(&key(1, 1), &LocationRecord::approximated(1.0, 2.0))
            .await
            .unwrap();
        tier.store(&key(1, 1), &LocationRecord::fallback(3.0, 4.0))
            .await
            .unwrap();

        let record = tier.lookup(&key(1, 1)).await.unwrap().unwrap();
        assert!(record.is_default());
        assert_eq!(record.lat, 3.0);
        assert_eq!(tier.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sentinel_ranges_survive() {
        let dir = tempfile::tempdir().unwrap();
        let tier = writable(&dir, TierId::Own).await;

        tier.store(&key(1, 1), &LocationRecord::fallback(46.909009, 7.360584))
            .await
            .unwrap();
        tier.store(&key(1, 2), &LocationRecord::approximated(46.0, 7.0))
            .await
            .unwrap();

        let default = tier.lookup(&key(1, 1)).await.unwrap().unwrap();
        assert_eq!(default.range, cellgeo_core::DEFAULT_RANGE);
        let approx = tier.lookup(&key(1, 2)).await.unwrap().unwrap();
        assert_eq!(approx.range, cellgeo_core::APPROXIMATED_RANGE);
    }

    #[tokio::test]
    async fn test_delete_and_keys() {
        let dir = tempfile::tempdir().unwrap();
        let tier = writable(&dir, TierId::UnwiredLabs).await;

        for cell in [3, 1, 2] {
            tier.store(&key(9, cell), &LocationRecord::new(1.0, 1.0, 10))
                .await
                .unwrap();
        }
        assert_eq!(tier.keys().await.unwrap(), vec![key(9, 1), key(9, 2), key(9, 3)]);

        assert!(tier.delete(&key(9, 2)).await.unwrap());
        assert!(!tier.delete(&key(9, 2)).await.unwrap());
        assert_eq!(tier.keys().await.unwrap(), vec![key(9, 1), key(9, 3)]);
    }

    #[tokio::test]
    async fn test_stale_keys() {
        let dir = tempfile::tempdir().unwrap();
        let tier = writable(&dir, TierId::Glm).await;

        for cell in [1, 2, 3] {
            tier.store(&key(4, cell), &LocationRecord::new(1.0, 1.0, 10))
                .await
                .unwrap();
        }
        query("UPDATE cells SET updated_at = 1000 WHERE cellid = 1")
            .execute(tier.pool())
            .await
            .unwrap();
        query("UPDATE cells SET updated_at = NULL WHERE cellid = 3")
            .execute(tier.pool())
            .await
            .unwrap();

        let cutoff = now_utc() - time::Duration::hours(1);
        assert_eq!(tier.stale_keys(cutoff).await.unwrap(), vec![key(4, 1), key(4, 3)]);

        let cutoff = now_utc() + time::Duration::hours(1);
        assert_eq!(tier.stale_keys(cutoff).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_read_only_tier() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oci_cells.sqlite");

        let seed = SqliteTier::open(TierId::Glm, SqliteConfig::new(&path))
            .await
            .unwrap();
        seed.store(&key(5, 1), &LocationRecord::new(10.0, 20.0, 100))
            .await
            .unwrap();
        seed.store(&key(5, 2), &LocationRecord::new(30.0, 40.0, 200))
            .await
            .unwrap();
        seed.close().await;

        let tier = SqliteTier::open(TierId::OpenCellId, SqliteConfig::new(&path))
            .await
            .unwrap();
        assert_eq!(tier.access(), TierAccess::ReadOnly);

        let record = tier.lookup(&key(5, 1)).await.unwrap().unwrap();
        assert_eq!(record.range, 100);
        assert!(record.created_at.is_none());

        let err = tier
            .store(&key(5, 3), &LocationRecord::new(0.0, 0.0, 1))
            .await
            .unwrap_err();
        assert!(err.is_read_only());
        assert!(tier.delete(&key(5, 1)).await.unwrap_err().is_read_only());

        let area = tier.area_records(&key(5, 0).area()).await.unwrap();
        assert_eq!(area.len(), 2);
        assert!(tier.area_records(&key(6, 0).area()).await.unwrap().is_empty());

        assert!(tier.source_modified().is_some());
    }
}
