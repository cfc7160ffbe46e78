//! The resolution pipeline.
//!
//! Steps, short-circuiting on the first answer:
//!
//! 1. validate the key
//! 2. tiers in trust order
//! 3. providers in priority order, writing answers back to their cache tier
//! 4. area centroid from the authoritative tier, stored in `own`
//! 5. the configured default location, stored in `own`

use std::fmt;
use std::sync::Arc;

use cellgeo_core::{CellKey, CellQuery, LocationRecord};
use cellgeo_providers::{DynProvider, ProviderOutcome};
use cellgeo_storage::{DynTier, TierId, TierStack};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::approximation::Approximator;
use crate::error::ResolveError;
use crate::stats::ResolverStats;

/// Location returned when nothing better is known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefaultLocation {
    pub lat: f64,
    pub lon: f64,
}

impl Default for DefaultLocation {
    fn default() -> Self {
        Self {
            lat: 46.909009,
            lon: 7.360584,
        }
    }
}

/// Tunables of the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Ask the next provider when one reports the cell as unknown, instead of
    /// going straight to approximation.
    pub continue_after_not_found: bool,

    pub default_location: DefaultLocation,
}

/// Where an answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Tier(TierId),
    Provider(&'static str),
    Approximated,
    Default,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tier(tier) => write!(f, "tier:{tier}"),
            Self::Provider(id) => write!(f, "provider:{id}"),
            Self::Approximated => f.write_str("approximated"),
            Self::Default => f.write_str("default"),
        }
    }
}

/// A resolved location and its origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub record: LocationRecord,
    pub source: Source,
}

impl Resolution {
    /// Whether the answer is the global fallback, whether just computed or
    /// served from cache.
    pub fn is_default(&self) -> bool {
        self.record.is_default()
    }
}

/// Resolves cell keys through tiers, providers, approximation and default.
pub struct Resolver {
    tiers: TierStack,
    providers: Vec<DynProvider>,
    approximator: Approximator,
    own: DynTier,
    options: PipelineOptions,
    stats: Arc<ResolverStats>,
}

impl Resolver {
    /// Assembles a resolver.
    ///
    /// Approximation reads from the `opencellid` tier when present.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::MissingTier`] if the `own` tier or the cache
    /// tier of any provider is not in `tiers`.
    pub fn new(
        tiers: TierStack,
        providers: Vec<DynProvider>,
        options: PipelineOptions,
    ) -> Result<Self, ResolveError> {
        let own = tiers
            .get(TierId::Own)
            .cloned()
            .ok_or(ResolveError::MissingTier(TierId::Own))?;

        for provider in &providers {
            let cache = provider.cache_tier();
            if tiers.get(cache).is_none() {
                return Err(ResolveError::MissingTier(cache));
            }
        }

        let approximator = Approximator::new(tiers.get(TierId::OpenCellId).cloned());

        Ok(Self {
            tiers,
            providers,
            approximator,
            own,
            options,
            stats: Arc::new(ResolverStats::new()),
        })
    }

    pub fn tiers(&self) -> &TierStack {
        &self.tiers
    }

    pub fn providers(&self) -> &[DynProvider] {
        &self.providers
    }

    pub fn stats(&self) -> &Arc<ResolverStats> {
        &self.stats
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Validates `query` and resolves it.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidInput`] before any lookup if a field is
    /// out of bounds, and [`ResolveError::Storage`] if a tier fails.
    pub async fn resolve(&self, query: &CellQuery) -> Result<Resolution, ResolveError> {
        let key = match query.validate() {
            Ok(key) => key,
            Err(e) => {
                self.stats.record_invalid();
                debug!(error = %e, "rejected cell query");
                return Err(e.into());
            }
        };
        self.resolve_key(&key).await
    }

    /// Resolves an already validated key.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Storage`] if a tier fails.
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn resolve_key(&self, key: &CellKey) -> Result<Resolution, ResolveError> {
        self.stats.record_request();

        let result = self.run(key).await;
        match &result {
            Ok(resolution) => {
                info!(
                    source = %resolution.source,
                    lat = resolution.record.lat,
                    lon = resolution.record.lon,
                    range = resolution.record.range,
                    requests = self.stats.requests(),
                    "resolved cell"
                );
            }
            Err(e) => {
                self.stats.record_storage_fault();
                tracing::error!(error = %e, "resolution failed");
            }
        }
        result
    }

    async fn run(&self, key: &CellKey) -> Result<Resolution, ResolveError> {
        for tier in self.tiers.iter() {
            let hit = tier
                .lookup(key)
                .await
                .map_err(|e| ResolveError::storage(tier.id(), "lookup", e))?;
            if let Some(record) = hit {
                self.stats.record_tier_hit(tier.id());
                return Ok(Resolution {
                    record,
                    source: Source::Tier(tier.id()),
                });
            }
        }

        for provider in &self.providers {
            match provider.locate(key).await {
                ProviderOutcome::Found(record) => {
                    let cache = provider.cache_tier();
                    self.write(cache, key, &record).await?;
                    self.stats.record_provider_answer(cache);
                    return Ok(Resolution {
                        record,
                        source: Source::Provider(provider.id()),
                    });
                }
                ProviderOutcome::NotFound => {
                    self.stats.record_provider_not_found();
                    debug!(provider = provider.id(), "cell unknown to provider");
                    if !self.options.continue_after_not_found {
                        break;
                    }
                }
                ProviderOutcome::QuotaExceeded => {
                    self.stats.record_provider_quota_exceeded();
                    warn!(provider = provider.id(), "provider quota exceeded");
                    break;
                }
                ProviderOutcome::TransportError(e) => {
                    self.stats.record_provider_error();
                    warn!(provider = provider.id(), error = %e, "provider unavailable");
                }
            }
        }

        let area = key.area();
        let approximated = self.approximator.approximate(&area).await.map_err(|e| {
            let tier = self.approximator.source_tier().unwrap_or(TierId::OpenCellId);
            ResolveError::storage(tier, "area_records", e)
        })?;

        if let Some(record) = approximated {
            self.write(TierId::Own, key, &record).await?;
            self.stats.record_approximated();
            return Ok(Resolution {
                record,
                source: Source::Approximated,
            });
        }

        let fallback = self.options.default_location;
        let record = LocationRecord::fallback(fallback.lat, fallback.lon);
        self.write(TierId::Own, key, &record).await?;
        self.stats.record_defaulted();
        Ok(Resolution {
            record,
            source: Source::Default,
        })
    }

    async fn write(
        &self,
        tier: TierId,
        key: &CellKey,
        record: &LocationRecord,
    ) -> Result<(), ResolveError> {
        let target = if tier == TierId::Own {
            &self.own
        } else {
            self.tiers.get(tier).ok_or(ResolveError::MissingTier(tier))?
        };
        target
            .store(key, record)
            .await
            .map_err(|e| ResolveError::storage(tier, "store", e))
    }
}
