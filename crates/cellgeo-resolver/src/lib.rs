//! Location resolution for cellgeo.
//!
//! [`Resolver`] answers a cell query from the first tier that knows it, then
//! from remote providers, then by approximating from neighbouring cells, and
//! finally with a configured default. [`Reconciler`] prunes cache entries that
//! a more trusted tier has since learned about. [`Refresher`] asks providers
//! again about cached answers that have not been rewritten for a while.

pub mod approximation;
pub mod error;
pub mod pipeline;
pub mod reconcile;
pub mod refresh;
pub mod stats;

pub use approximation::{Approximator, centroid};
pub use error::{ReconcileError, RefreshError, ResolveError};
pub use pipeline::{DefaultLocation, PipelineOptions, Resolution, Resolver, Source};
pub use reconcile::{ReconcileReport, Reconciler};
pub use refresh::{MAX_JUMP_KM, RefreshOptions, RefreshReport, Refresher};
pub use stats::{ResolverStats, StatsSnapshot};
