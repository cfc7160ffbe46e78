//! Re-querying providers for cached answers that have gone stale.

use cellgeo_core::{LocationRecord, RecordKind};
use cellgeo_providers::{DynProvider, ProviderOutcome};
use cellgeo_storage::{TierId, TierStack};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::error::RefreshError;

/// Half the equatorial circumference of the earth.
pub const MAX_JUMP_KM: f64 = 20_037.5;

const PROGRESS_EVERY: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshOptions {
    /// A fresh answer further than this from the cached one is rejected.
    pub max_jump_km: f64,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            max_jump_km: MAX_JUMP_KM,
        }
    }
}

/// Outcome of one refresh run over a provider cache tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshReport {
    pub tier: TierId,
    pub provider: &'static str,
    /// Entries not written since the cutoff when the run started.
    pub stale: u64,
    pub processed: u64,
    /// Provider answered; the entry now carries the new position.
    pub refreshed: u64,
    /// Provider no longer knows the cell; only the timestamp moved.
    pub missed: u64,
    /// Provider answered implausibly; only the timestamp moved.
    pub rejected: u64,
    /// Provider unreachable or a storage call failed; entry left as is.
    pub failed: u64,
    /// The run stopped early because the provider ran out of quota.
    pub quota_exhausted: bool,
}

impl RefreshReport {
    fn new(tier: TierId, provider: &'static str, stale: u64) -> Self {
        Self {
            tier,
            provider,
            stale,
            processed: 0,
            refreshed: 0,
            missed: 0,
            rejected: 0,
            failed: 0,
            quota_exhausted: false,
        }
    }
}

/// Asks each provider again about the entries of its cache tier that were
/// last written before a cutoff.
#[derive(Clone)]
pub struct Refresher {
    tiers: TierStack,
    providers: Vec<DynProvider>,
    options: RefreshOptions,
}

impl std::fmt::Debug for Refresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Refresher")
            .field("tiers", &self.tiers.ids())
            .field(
                "providers",
                &self.providers.iter().map(|p| p.id()).collect::<Vec<_>>(),
            )
            .field("options", &self.options)
            .finish()
    }
}

impl Refresher {
    pub fn new(tiers: TierStack, providers: Vec<DynProvider>, options: RefreshOptions) -> Self {
        Self {
            tiers,
            providers,
            options,
        }
    }

    /// Cache tiers that have both a configured tier and an enabled provider.
    pub fn refreshable(&self) -> Vec<TierId> {
        self.providers
            .iter()
            .map(|p| p.cache_tier())
            .filter(|id| self.tiers.get(*id).is_some())
            .collect()
    }

    /// Refreshes every entry of `tier` last written before `cutoff`.
    ///
    /// Entries are rewritten on every answer except transport failures, so a
    /// run interrupted half way picks up where it stopped.
    ///
    /// # Errors
    ///
    /// Fails if `tier` is read-only, not configured, has no provider, or
    /// cannot be enumerated.
    pub async fn refresh(
        &self,
        tier: TierId,
        cutoff: OffsetDateTime,
    ) -> Result<RefreshReport, RefreshError> {
        if tier.is_read_only() {
            return Err(RefreshError::ReadOnlyTier(tier));
        }
        let target = self.tiers.get(tier).ok_or(RefreshError::UnknownTier(tier))?;
        let provider = self
            .providers
            .iter()
            .find(|p| p.cache_tier() == tier)
            .ok_or(RefreshError::NoProvider(tier))?;

        let keys = target
            .stale_keys(cutoff)
            .await
            .map_err(|source| RefreshError::Enumerate { tier, source })?;

        info!(tier = %tier, provider = provider.id(), stale = keys.len(), "refresh started");
        let mut report = RefreshReport::new(tier, provider.id(), keys.len() as u64);

        for key in keys {
            let cached = match target.lookup(&key).await {
                Ok(Some(record)) => record,
                // Removed since enumeration, most likely by reconciliation.
                Ok(None) => continue,
                Err(e) => {
                    report.processed += 1;
                    report.failed += 1;
                    warn!(key = %key, error = %e, "lookup failed");
                    continue;
                }
            };
            report.processed += 1;

            let update = match provider.locate(&key).await {
                ProviderOutcome::Found(fresh) => {
                    if self.is_plausible(&cached, &fresh) {
                        report.refreshed += 1;
                        fresh
                    } else {
                        report.rejected += 1;
                        debug!(key = %key, lat = fresh.lat, lon = fresh.lon, range = fresh.range, "implausible answer rejected");
                        cached
                    }
                }
                ProviderOutcome::NotFound => {
                    report.missed += 1;
                    cached
                }
                ProviderOutcome::QuotaExceeded => {
                    report.failed += 1;
                    report.quota_exhausted = true;
                    warn!(tier = %tier, provider = provider.id(), "provider quota exceeded, refresh stopped");
                    break;
                }
                ProviderOutcome::TransportError(e) => {
                    report.failed += 1;
                    debug!(key = %key, error = %e, "provider unavailable");
                    continue;
                }
            };

            // Writing stamps `updated_at`, which takes the key out of the stale set.
            if let Err(e) = target.store(&key, &update).await {
                report.failed += 1;
                warn!(key = %key, error = %e, "store failed");
            }

            if report.processed % PROGRESS_EVERY == 0 {
                debug!(
                    tier = %tier,
                    processed = report.processed,
                    refreshed = report.refreshed,
                    "refresh progress"
                );
            }
        }

        info!(
            tier = %tier,
            processed = report.processed,
            refreshed = report.refreshed,
            missed = report.missed,
            rejected = report.rejected,
            failed = report.failed,
            "refresh finished"
        );
        Ok(report)
    }

    /// Refreshes every refreshable tier in provider order.
    ///
    /// A tier that cannot be enumerated is logged and skipped.
    pub async fn refresh_all(&self, cutoff: OffsetDateTime) -> Vec<RefreshReport> {
        let mut reports = Vec::new();
        for tier in self.refreshable() {
            match self.refresh(tier, cutoff).await {
                Ok(report) => reports.push(report),
                Err(e) => warn!(tier = %tier, error = %e, "refresh skipped"),
            }
        }
        reports
    }

    fn is_plausible(&self, cached: &LocationRecord, fresh: &LocationRecord) -> bool {
        if !fresh.is_plausible_observation() {
            return false;
        }
        cached.kind() != RecordKind::Observed
            || cached.distance_km(fresh) <= self.options.max_jump_km
    }
}
