use std::sync::Arc;

use async_trait::async_trait;
use cellgeo_core::CellKey;
use cellgeo_storage::TierId;

use crate::outcome::ProviderOutcome;

/// A remote service that can locate a cell.
///
/// `locate` never fails: transport and decode problems are reported as
/// [`ProviderOutcome::TransportError`].
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Stable provider name, used in logs, stats and responses.
    fn id(&self) -> &'static str;

    /// Tier that caches this provider's answers.
    fn cache_tier(&self) -> TierId;

    /// Asks the provider for the location of `key`.
    async fn locate(&self, key: &CellKey) -> ProviderOutcome;
}

/// Type alias for a shared provider handle.
pub type DynProvider = Arc<dyn LocationProvider>;
