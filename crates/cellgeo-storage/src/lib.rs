//! Cache tier abstraction for cellgeo.
//!
//! Every backing store (the two external datasets and the three resolver
//! caches) implements [`CacheTier`]. The resolver only ever talks to tiers
//! through this trait, so tiers can be backed by SQLite files, memory, or
//! anything else that maps a [`cellgeo_core::CellKey`] to a record.

pub mod error;
pub mod memory;
pub mod stack;
pub mod tier;
pub mod traits;

pub use error::{ErrorCategory, StorageError};
pub use memory::InMemoryTier;
pub use stack::{DynTier, TierStack};
pub use tier::{TierAccess, TierId};
pub use traits::CacheTier;
