//! Shared request state and its construction from configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use cellgeo_db_sqlite::SqliteTier;
use cellgeo_providers::{DynProvider, build_providers};
use cellgeo_core::now_utc;
use cellgeo_resolver::{Reconciler, RefreshOptions, Refresher, Resolver};
use time::OffsetDateTime;
use cellgeo_storage::{DynTier, InMemoryTier, TierId, TierStack};
use tracing::{info, warn};

use crate::config::{AppConfig, StorageBackend};

/// Refresh age used when none is configured: 30 days.
const DEFAULT_REFRESH_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
    pub reconciler: Reconciler,
    pub refresher: Refresher,
    /// Default age for on-demand refreshes
    pub refresh_max_age: Duration,
}

impl AppState {
    /// Wires a resolver, reconciler and refresher over the same tiers.
    pub fn new(resolver: Resolver) -> Self {
        let reconciler = Reconciler::new(resolver.tiers().clone());
        let refresher = Refresher::new(
            resolver.tiers().clone(),
            resolver.providers().to_vec(),
            RefreshOptions::default(),
        );
        Self {
            resolver: Arc::new(resolver),
            reconciler,
            refresher,
            refresh_max_age: DEFAULT_REFRESH_MAX_AGE,
        }
    }

    pub fn with_refresh(mut self, options: RefreshOptions, max_age: Duration) -> Self {
        self.refresher = Refresher::new(
            self.resolver.tiers().clone(),
            self.resolver.providers().to_vec(),
            options,
        );
        self.refresh_max_age = max_age;
        self
    }

    /// Opens the configured tiers and providers.
    pub async fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let tiers = open_tiers(cfg).await?;
        let providers: Vec<DynProvider> =
            build_providers(&cfg.providers).context("failed to build providers")?;
        let resolver = Resolver::new(tiers, providers, cfg.pipeline_options())
            .context("failed to assemble resolver")?;

        info!(
            tiers = ?resolver.tiers().ids(),
            providers = ?resolver.providers().iter().map(|p| p.id()).collect::<Vec<_>>(),
            "resolver ready"
        );
        Ok(Self::new(resolver).with_refresh(cfg.refresh_options(), cfg.refresh_max_age()))
    }

    pub fn tiers(&self) -> &TierStack {
        self.resolver.tiers()
    }
}

/// Entries last written before the returned instant are due for a refresh.
pub fn refresh_cutoff(max_age: Duration) -> OffsetDateTime {
    now_utc() - max_age
}

/// Opens every tier for the configured backend.
///
/// A missing dataset file for a read-only tier is skipped with a warning;
/// writable tiers are created on demand.
pub async fn open_tiers(cfg: &AppConfig) -> anyhow::Result<TierStack> {
    let mut stack = TierStack::new();

    match cfg.storage.backend {
        StorageBackend::Memory => {
            for id in TierId::ALL {
                stack.insert(Arc::new(InMemoryTier::new(id)));
            }
        }
        StorageBackend::Sqlite => {
            if !cfg.storage.data_dir.exists() {
                std::fs::create_dir_all(&cfg.storage.data_dir).with_context(|| {
                    format!(
                        "failed to create data directory {}",
                        cfg.storage.data_dir.display()
                    )
                })?;
            }

            for id in TierId::ALL {
                let sqlite = cfg.storage.sqlite_for(id);
                if id.is_read_only() && !sqlite.path.exists() {
                    warn!(tier = %id, path = %sqlite.path.display(), "dataset file not found, tier disabled");
                    continue;
                }
                let tier = SqliteTier::open(id, sqlite)
                    .await
                    .with_context(|| format!("failed to open tier {id}"))?;
                stack.insert(Arc::new(tier) as DynTier);
            }
        }
    }

    Ok(stack)
}
