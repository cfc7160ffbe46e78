//! Resolution counters.
//!
//! Counters are informational only and use relaxed ordering.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use cellgeo_storage::TierId;
use serde::Serialize;

/// Atomic counters describing how requests were answered.
#[derive(Debug, Default)]
pub struct ResolverStats {
    requests: AtomicU64,
    invalid: AtomicU64,
    storage_faults: AtomicU64,
    tier_hits: [AtomicU64; 5],
    provider_answers: [AtomicU64; 5],
    provider_not_found: AtomicU64,
    provider_quota_exceeded: AtomicU64,
    provider_errors: AtomicU64,
    approximated: AtomicU64,
    defaulted: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

fn load(counter: &AtomicU64) -> u64 {
    counter.load(Ordering::Relaxed)
}

impl ResolverStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        bump(&self.requests);
    }

    pub fn record_invalid(&self) {
        bump(&self.invalid);
    }

    pub fn record_storage_fault(&self) {
        bump(&self.storage_faults);
    }

    pub fn record_tier_hit(&self, tier: TierId) {
        bump(&self.tier_hits[tier.rank()]);
    }

    /// Counts a provider answer by the tier that caches it.
    pub fn record_provider_answer(&self, cache_tier: TierId) {
        bump(&self.provider_answers[cache_tier.rank()]);
    }

    pub fn record_provider_not_found(&self) {
        bump(&self.provider_not_found);
    }

    pub fn record_provider_quota_exceeded(&self) {
        bump(&self.provider_quota_exceeded);
    }

    pub fn record_provider_error(&self) {
        bump(&self.provider_errors);
    }

    pub fn record_approximated(&self) {
        bump(&self.approximated);
    }

    pub fn record_defaulted(&self) {
        bump(&self.defaulted);
    }

    pub fn requests(&self) -> u64 {
        load(&self.requests)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let per_tier = |counters: &[AtomicU64; 5]| {
            TierId::ALL
                .into_iter()
                .map(|tier| (tier, load(&counters[tier.rank()])))
                .collect::<BTreeMap<_, _>>()
        };

        StatsSnapshot {
            requests: load(&self.requests),
            invalid: load(&self.invalid),
            storage_faults: load(&self.storage_faults),
            tier_hits: per_tier(&self.tier_hits),
            provider_answers: per_tier(&self.provider_answers)
                .into_iter()
                .filter(|(tier, _)| !tier.is_read_only() && *tier != TierId::Own)
                .collect(),
            provider_not_found: load(&self.provider_not_found),
            provider_quota_exceeded: load(&self.provider_quota_exceeded),
            provider_errors: load(&self.provider_errors),
            approximated: load(&self.approximated),
            defaulted: load(&self.defaulted),
        }
    }
}

/// Point-in-time copy of [`ResolverStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub invalid: u64,
    pub storage_faults: u64,
    pub tier_hits: BTreeMap<TierId, u64>,
    pub provider_answers: BTreeMap<TierId, u64>,
    pub provider_not_found: u64,
    pub provider_quota_exceeded: u64,
    pub provider_errors: u64,
    pub approximated: u64,
    pub defaulted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let stats = ResolverStats::new();
        stats.record_request();
        stats.record_request();
        stats.record_tier_hit(TierId::Mozilla);
        stats.record_provider_answer(TierId::Glm);
        stats.record_defaulted();

        let snap = stats.snapshot();
        assert_eq!(snap.requests, 2);
        assert_eq!(snap.tier_hits[&TierId::Mozilla], 1);
        assert_eq!(snap.tier_hits[&TierId::OpenCellId], 0);
        assert_eq!(snap.tier_hits.len(), 5);
        assert_eq!(snap.provider_answers[&TierId::Glm], 1);
        assert_eq!(snap.provider_answers.len(), 2);
        assert_eq!(snap.defaulted, 1);
    }

    #[test]
    fn test_snapshot_serializes_tier_names() {
        let stats = ResolverStats::new();
        stats.record_tier_hit(TierId::OpenCellId);
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["tier_hits"]["opencellid"], 1);
        assert_eq!(json["provider_answers"]["unwiredlabs"], 0);
    }
}
