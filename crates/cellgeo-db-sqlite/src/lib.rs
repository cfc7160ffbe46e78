//! SQLite tier backend for cellgeo.
//!
//! This crate provides a SQLite implementation of the `CacheTier` trait from
//! `cellgeo-storage`, using sqlx for queries. Each tier lives in its own file
//! holding a single `cells` table.
//!
//! # Example
//!
//! ```ignore
//! use cellgeo_db_sqlite::{SqliteConfig, SqliteTier};
//! use cellgeo_storage::{CacheTier, TierId};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let oci = SqliteTier::open(TierId::OpenCellId, SqliteConfig::new("oci_cells.sqlite")).await?;
//! let key = cellgeo_core::CellKey::new(228, 1, 1, 1)?;
//! let record = oci.lookup(&key).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Configuration for one tier file
//! - [`error`]: Error types specific to SQLite operations
//! - [`pool`]: Connection pool management
//! - [`schema`]: Table creation for writable tiers
//! - [`tier`]: The `CacheTier` implementation

pub mod config;
pub mod error;
pub mod pool;
pub mod schema;
pub mod tier;

pub use config::SqliteConfig;
pub use error::{Result, SqliteError};
pub use pool::{SqlitePoolOptions, create_pool};
pub use tier::SqliteTier;

// Re-export storage traits for convenience
pub use cellgeo_storage::{CacheTier, StorageError, TierId};
