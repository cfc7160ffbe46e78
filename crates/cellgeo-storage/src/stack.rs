//! The ordered set of tiers consulted during resolution.

use std::sync::Arc;

use cellgeo_core::{CellKey, LocationRecord};

use crate::error::StorageError;
use crate::tier::TierId;
use crate::traits::CacheTier;

/// Type alias for a shared tier handle.
pub type DynTier = Arc<dyn CacheTier>;

/// Tiers kept in trust order; at most one per [`TierId`].
#[derive(Clone, Default)]
pub struct TierStack {
    tiers: Vec<DynTier>,
}

impl TierStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tier, replacing any previous tier with the same id.
    pub fn with_tier(mut self, tier: DynTier) -> Self {
        self.insert(tier);
        self
    }

    pub fn insert(&mut self, tier: DynTier) {
        self.tiers.retain(|t| t.id() != tier.id());
        self.tiers.push(tier);
        self.tiers.sort_by_key(|t| t.id().rank());
    }

    pub fn get(&self, id: TierId) -> Option<&DynTier> {
        self.tiers.iter().find(|t| t.id() == id)
    }

    /// Tiers in lookup order.
    pub fn iter(&self) -> impl Iterator<Item = &DynTier> {
        self.tiers.iter()
    }

    /// Tiers that outrank `id`, most trusted first.
    pub fn higher_than(&self, id: TierId) -> impl Iterator<Item = &DynTier> {
        self.tiers.iter().filter(move |t| t.id().rank() < id.rank())
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Ids of the configured tiers, in lookup order.
    pub fn ids(&self) -> Vec<TierId> {
        self.tiers.iter().map(|t| t.id()).collect()
    }

    /// Returns the first hit in trust order, with the tier that answered.
    ///
    /// Stops at the first storage error.
    pub async fn first_hit(
        &self,
        key: &CellKey,
    ) -> Result<Option<(TierId, LocationRecord)>, (TierId, StorageError)> {
        for tier in &self.tiers {
            match tier.lookup(key).await {
                Ok(Some(record)) => return Ok(Some((tier.id(), record))),
                Ok(None) => continue,
                Err(e) => return Err((tier.id(), e)),
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for TierStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tiers.iter().map(|t| (t.id(), t.backend_name())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryTier;

    fn key() -> CellKey {
        CellKey::new(228, 1, 1, 1).unwrap()
    }

    #[test]
    fn test_insert_sorts_and_replaces() {
        let stack = TierStack::new()
            .with_tier(Arc::new(InMemoryTier::new(TierId::Own)))
            .with_tier(Arc::new(InMemoryTier::new(TierId::OpenCellId)))
            .with_tier(Arc::new(InMemoryTier::new(TierId::Glm)))
            .with_tier(Arc::new(InMemoryTier::new(TierId::Glm)));

        assert_eq!(stack.ids(), vec![TierId::OpenCellId, TierId::Glm, TierId::Own]);
        let above: Vec<TierId> = stack.higher_than(TierId::Own).map(|t| t.id()).collect();
        assert_eq!(above, vec![TierId::OpenCellId, TierId::Glm]);
    }

    #[tokio::test]
    async fn test_first_hit_prefers_trusted_tier() {
        let ocid = InMemoryTier::new(TierId::OpenCellId);
        let own = InMemoryTier::new(TierId::Own);
        own.seed(key(), LocationRecord::new(2.0, 2.0, 20));

        let stack = TierStack::new()
            .with_tier(Arc::new(own))
            .with_tier(Arc::new(ocid.clone()));
        let (tier, record) = stack.first_hit(&key()).await.unwrap().unwrap();
        assert_eq!(tier, TierId::Own);
        assert_eq!(record.lat, 2.0);

        ocid.seed(key(), LocationRecord::new(1.0, 1.0, 10));
        let (tier, _) = stack.first_hit(&key()).await.unwrap().unwrap();
        assert_eq!(tier, TierId::OpenCellId);
    }
}
