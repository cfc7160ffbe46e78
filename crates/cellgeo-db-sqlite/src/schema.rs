//! Schema management for writable SQLite tiers.
//!
//! Every tier file holds a single `cells` table. External datasets ship with
//! their own copy of it; writable caches get theirs created here.

use sqlx_core::query::query;
use sqlx_sqlite::SqlitePool;
use tracing::{debug, instrument};

use crate::error::{Result, SqliteError};

const CREATE_CELLS_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS cells (
    mcc INTEGER NOT NULL,
    mnc INTEGER NOT NULL,
    lac INTEGER NOT NULL,
    cellid INTEGER NOT NULL,
    lat REAL NOT NULL,
    lon REAL NOT NULL,
    range INTEGER NOT NULL,
    created_at INTEGER,
    updated_at INTEGER,
    PRIMARY KEY (mcc, mnc, lac, cellid)
)";

// Older cache files were created without a primary key; upserts need one.
const CREATE_KEY_INDEX: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS cells_key ON cells (mcc, mnc, lac, cellid)";

/// Creates the `cells` table and its key index if missing.
///
/// Idempotent; safe to run on every startup.
#[instrument(skip(pool))]
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    query(CREATE_CELLS_TABLE)
        .execute(pool)
        .await
        .map_err(SqliteError::from)?;
    query(CREATE_KEY_INDEX)
        .execute(pool)
        .await
        .map_err(SqliteError::from)?;

    debug!("cells schema ready");
    Ok(())
}
