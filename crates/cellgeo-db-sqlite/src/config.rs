//! Configuration types for the SQLite tier backend.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for one SQLite-backed tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Path to the database file.
    pub path: PathBuf,

    /// Connection pool size (maximum number of connections).
    pub pool_size: u32,

    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Open the file with SQLite's read-only flag.
    pub read_only: bool,

    /// Create the file and the `cells` table if missing. Ignored when read-only.
    pub create_if_missing: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("cells.sqlite"),
            pool_size: 4,
            connect_timeout_ms: 5000,
            read_only: false,
            create_if_missing: true,
        }
    }
}

impl SqliteConfig {
    /// Creates a new configuration for the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Sets the pool size.
    #[must_use]
    pub fn with_pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn with_connect_timeout_ms(mut self, timeout: u64) -> Self {
        self.connect_timeout_ms = timeout;
        self
    }

    /// Sets whether the file is opened read-only.
    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Sets whether a missing file is created.
    #[must_use]
    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }
}
