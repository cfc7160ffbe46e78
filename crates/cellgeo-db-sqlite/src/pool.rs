//! Connection pool management for the SQLite tier backend.

use std::time::Duration;

use sqlx_core::pool::PoolOptions;
use sqlx_sqlite::{Sqlite, SqliteConnectOptions, SqlitePool};
use tracing::{debug, info, instrument};

use crate::config::SqliteConfig;
use crate::error::{Result, SqliteError};

/// Type alias for SQLite pool options.
pub type SqlitePoolOptions = PoolOptions<Sqlite>;

/// Creates a new SQLite connection pool from the given configuration.
#[instrument(skip(config), fields(path = %config.path.display(), read_only = config.read_only))]
pub async fn create_pool(config: &SqliteConfig) -> Result<SqlitePool> {
    if config.path.as_os_str().is_empty() {
        return Err(SqliteError::config("database path is empty"));
    }

    info!(
        pool_size = config.pool_size,
        connect_timeout_ms = config.connect_timeout_ms,
        "Opening SQLite database"
    );

    let options = SqliteConnectOptions::new()
        .filename(&config.path)
        .read_only(config.read_only)
        .create_if_missing(config.create_if_missing && !config.read_only)
        .busy_timeout(Duration::from_millis(config.connect_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.pool_size.max(1))
        .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
        .connect_with(options)
        .await?;

    debug!("SQLite connection pool created successfully");

    Ok(pool)
}

/// Tests the connection to the database.
#[instrument(skip(pool))]
pub async fn test_connection(pool: &SqlitePool) -> Result<()> {
    sqlx_core::query::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(SqliteError::from)?;

    debug!("Database connection test successful");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("own_cells.sqlite");
        let pool = create_pool(&SqliteConfig::new(&path)).await.unwrap();
        test_connection(&pool).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_read_only_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = SqliteConfig::new(dir.path().join("missing.sqlite")).with_read_only(true);
        assert!(create_pool(&config).await.is_err());
    }

    #[test]
    fn test_empty_path_rejected() {
        use tokio_test::block_on;

        let err = block_on(create_pool(&SqliteConfig::new(""))).unwrap_err();
        assert!(matches!(err, SqliteError::Config { .. }));
    }
}
