//! Periodic maintenance of the writable tiers.

use std::future::Future;
use std::time::Duration;

use cellgeo_resolver::{Reconciler, Refresher};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::state::refresh_cutoff;

/// Handle of a running periodic job.
pub struct MaintenanceTask {
    name: &'static str,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl MaintenanceTask {
    /// Sweeps every writable tier once per `period`, starting one period
    /// after the call.
    pub fn reconcile(reconciler: Reconciler, period: Duration) -> Self {
        Self::spawn("reconciliation", period, move || {
            let reconciler = reconciler.clone();
            async move {
                let reports = reconciler.sweep_all().await;
                let removed: u64 = reports.iter().map(|r| r.removed).sum();
                debug!(tiers = reports.len(), removed, "scheduled reconciliation done");
            }
        })
    }

    /// Refreshes every provider cache once per `period`, asking again about
    /// entries older than `max_age`.
    pub fn refresh(refresher: Refresher, period: Duration, max_age: Duration) -> Self {
        Self::spawn("refresh", period, move || {
            let refresher = refresher.clone();
            async move {
                let reports = refresher.refresh_all(refresh_cutoff(max_age)).await;
                let refreshed: u64 = reports.iter().map(|r| r.refreshed).sum();
                debug!(tiers = reports.len(), refreshed, "scheduled refresh done");
            }
        })
    }

    fn spawn<F, Fut>(name: &'static str, period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            info!(job = name, interval_secs = period.as_secs(), "scheduler started");

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => job().await,
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            info!(job = name, "scheduler shutting down");
                            break;
                        }
                    }
                }
            }
        });

        Self {
            name,
            shutdown_tx,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stops the schedule, letting a run in progress finish first.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use cellgeo_core::{CellKey, LocationRecord};
    use cellgeo_providers::{DynProvider, LocationProvider, ProviderOutcome};
    use cellgeo_resolver::RefreshOptions;
    use cellgeo_storage::{CacheTier, InMemoryTier, TierId, TierStack};

    use super::*;

    struct Moved;

    #[async_trait]
    impl LocationProvider for Moved {
        fn id(&self) -> &'static str {
            "moved"
        }

        fn cache_tier(&self) -> TierId {
            TierId::Glm
        }

        async fn locate(&self, _: &CellKey) -> ProviderOutcome {
            ProviderOutcome::Found(LocationRecord::new(46.95, 7.45, 250))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sweeps_after_each_period() {
        let key = CellKey::new(228, 1, 1, 1).unwrap();
        let record = LocationRecord::new(46.9, 7.4, 300);
        let oci = InMemoryTier::read_only_with(TierId::OpenCellId, [(key, record)]);
        let own = InMemoryTier::new(TierId::Own);
        own.seed(key, record);

        let stack = TierStack::new()
            .with_tier(Arc::new(oci))
            .with_tier(Arc::new(own.clone()));
        let task = MaintenanceTask::reconcile(Reconciler::new(stack), Duration::from_secs(60));
        assert_eq!(task.name(), "reconciliation");

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(own.len().await.unwrap(), 1);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(own.len().await.unwrap(), 0);

        task.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_after_each_period() {
        let key = CellKey::new(228, 1, 1, 1).unwrap();
        let glm = InMemoryTier::new(TierId::Glm);
        // Never stamped, so always older than the cutoff.
        glm.seed(key, LocationRecord::new(46.9, 7.4, 300));

        let providers: Vec<DynProvider> = vec![Arc::new(Moved)];
        let refresher = Refresher::new(
            TierStack::new().with_tier(Arc::new(glm.clone())),
            providers,
            RefreshOptions::default(),
        );
        let task = MaintenanceTask::refresh(
            refresher,
            Duration::from_secs(60),
            Duration::from_secs(3600),
        );

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(glm.lookup(&key).await.unwrap().unwrap().range, 300);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(glm.lookup(&key).await.unwrap().unwrap().range, 250);

        task.stop().await;
    }
}
