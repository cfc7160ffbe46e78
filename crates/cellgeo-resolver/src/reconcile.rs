//! Pruning of cache entries that a more trusted tier now covers.

use cellgeo_storage::{TierId, TierStack};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ReconcileError;

/// Outcome of one sweep over a tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub tier: TierId,
    pub processed: u64,
    pub removed: u64,
    pub failed: u64,
}

impl ReconcileReport {
    fn new(tier: TierId) -> Self {
        Self {
            tier,
            processed: 0,
            removed: 0,
            failed: 0,
        }
    }
}

/// Removes entries from writable tiers when a higher tier has the same key.
#[derive(Debug, Clone)]
pub struct Reconciler {
    tiers: TierStack,
}

const PROGRESS_EVERY: u64 = 10_000;

impl Reconciler {
    pub fn new(tiers: TierStack) -> Self {
        Self { tiers }
    }

    /// Sweeps one tier.
    ///
    /// Lookup and delete failures for single keys are logged and counted in
    /// [`ReconcileReport::failed`]; the sweep carries on.
    ///
    /// # Errors
    ///
    /// Fails if `tier` is read-only, not configured, or cannot be enumerated.
    pub async fn sweep(&self, tier: TierId) -> Result<ReconcileReport, ReconcileError> {
        if tier.is_read_only() {
            return Err(ReconcileError::ReadOnlyTier(tier));
        }
        let target = self
            .tiers
            .get(tier)
            .ok_or(ReconcileError::UnknownTier(tier))?;

        let keys = target
            .keys()
            .await
            .map_err(|source| ReconcileError::Enumerate { tier, source })?;

        info!(tier = %tier, keys = keys.len(), "reconciliation started");
        let mut report = ReconcileReport::new(tier);

        for key in keys {
            report.processed += 1;

            for higher in self.tiers.higher_than(tier) {
                match higher.lookup(&key).await {
                    Ok(None) => continue,
                    Ok(Some(_)) => {
                        match target.delete(&key).await {
                            Ok(true) => {
                                report.removed += 1;
                                debug!(key = %key, covered_by = %higher.id(), "removed superseded entry");
                            }
                            Ok(false) => {}
                            Err(e) => {
                                report.failed += 1;
                                warn!(key = %key, error = %e, "delete failed");
                            }
                        }
                        break;
                    }
                    Err(e) => {
                        report.failed += 1;
                        warn!(key = %key, tier = %higher.id(), error = %e, "lookup failed");
                        break;
                    }
                }
            }

            if report.processed % PROGRESS_EVERY == 0 {
                debug!(tier = %tier, processed = report.processed, removed = report.removed, "reconciliation progress");
            }
        }

        info!(
            tier = %tier,
            processed = report.processed,
            removed = report.removed,
            failed = report.failed,
            "reconciliation finished"
        );
        Ok(report)
    }

    /// Sweeps every configured writable tier, most trusted first.
    ///
    /// A tier that cannot be enumerated is logged and skipped.
    pub async fn sweep_all(&self) -> Vec<ReconcileReport> {
        let writable: Vec<TierId> = self
            .tiers
            .ids()
            .into_iter()
            .filter(|t| !t.is_read_only())
            .collect();

        let mut reports = Vec::with_capacity(writable.len());
        for tier in writable {
            match self.sweep(tier).await {
                Ok(report) => reports.push(report),
                Err(e) => warn!(tier = %tier, error = %e, "reconciliation skipped"),
            }
        }
        reports
    }
}
