//! Remote geolocation providers for cellgeo.
//!
//! Each provider turns a [`cellgeo_core::CellKey`] into a
//! [`ProviderOutcome`]. Two providers exist, queried in this order:
//!
//! - [`GlmProvider`]: binary frame protocol, cached in the `glm` tier
//! - [`UnwiredLabsProvider`]: JSON REST API, cached in the `unwiredlabs` tier

pub mod config;
pub mod error;
pub mod glm;
pub mod outcome;
pub mod traits;
pub mod unwiredlabs;

use std::sync::Arc;

use tracing::{info, warn};

pub use config::{GlmConfig, ProvidersConfig, UnwiredLabsConfig};
pub use error::ProviderError;
pub use glm::GlmProvider;
pub use outcome::ProviderOutcome;
pub use traits::{DynProvider, LocationProvider};
pub use unwiredlabs::UnwiredLabsProvider;

/// Builds the enabled providers in query order.
///
/// The REST provider is skipped with a warning when no token can be found.
///
/// # Errors
///
/// Returns an error if an HTTP client cannot be constructed.
pub fn build_providers(config: &ProvidersConfig) -> Result<Vec<DynProvider>, ProviderError> {
    let mut providers: Vec<DynProvider> = Vec::new();

    if config.glm.enabled {
        providers.push(Arc::new(GlmProvider::new(&config.glm, config.timeout_ms)?));
        info!(url = %config.glm.url, "glm provider enabled");
    }

    if config.unwiredlabs.enabled {
        match config.unwiredlabs.resolve_token() {
            Some(token) => {
                providers.push(Arc::new(UnwiredLabsProvider::new(
                    &config.unwiredlabs,
                    token,
                    config.timeout_ms,
                )?));
                info!(url = %config.unwiredlabs.url, "unwiredlabs provider enabled");
            }
            None => warn!(
                "No Unwired Labs token supplied via providers.unwiredlabs.token, \
                 UNWIREDLABS_TOKEN or OPENCELLID_API_KEY; provider disabled"
            ),
        }
    }

    Ok(providers)
}
