//! Client for the Unwired Labs (OpenCelliD) REST API.

use std::time::Duration;

use async_trait::async_trait;
use cellgeo_core::{CellKey, LocationRecord};
use cellgeo_storage::TierId;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::UnwiredLabsConfig;
use crate::error::ProviderError;
use crate::outcome::ProviderOutcome;
use crate::traits::LocationProvider;

#[derive(Debug, Serialize)]
struct RequestBody<'a> {
    token: &'a str,
    mcc: u32,
    mnc: u32,
    cells: [RequestCell; 1],
}

#[derive(Debug, Serialize)]
struct RequestCell {
    lac: u32,
    cid: u32,
}

/// Decodes a response body.
///
/// An exhausted balance is checked before the status so that quota problems
/// are never mistaken for unknown cells.
pub fn decode_body(body: &[u8]) -> ProviderOutcome {
    let answer: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => return ProviderOutcome::TransportError(ProviderError::decode(e.to_string())),
    };

    if answer.get("balance").and_then(Value::as_f64) == Some(0.0) {
        return ProviderOutcome::QuotaExceeded;
    }
    if answer.get("status").and_then(Value::as_str) == Some("error") {
        debug!(message = ?answer.get("message"), "provider does not know the cell");
        return ProviderOutcome::NotFound;
    }

    let lat = answer.get("lat").and_then(Value::as_f64);
    let lon = answer.get("lon").and_then(Value::as_f64);
    let accuracy = answer.get("accuracy").and_then(Value::as_f64);

    match (lat, lon, accuracy) {
        (Some(lat), Some(lon), Some(accuracy)) => {
            let Some(range) = whole_meters(accuracy) else {
                return ProviderOutcome::TransportError(ProviderError::decode(format!(
                    "accuracy {accuracy} is not a whole number of meters"
                )));
            };
            let record = LocationRecord::new(lat, lon, range);
            if let Err(e) = record.validate_coordinates() {
                return ProviderOutcome::TransportError(ProviderError::decode(e.to_string()));
            }
            // Reserved range values must never enter a cache tier as observations.
            if !record.is_plausible_observation() {
                return ProviderOutcome::TransportError(ProviderError::decode(format!(
                    "implausible accuracy {range}"
                )));
            }
            ProviderOutcome::Found(record)
        }
        _ => ProviderOutcome::TransportError(ProviderError::decode(
            "response lacks lat, lon or accuracy",
        )),
    }
}

/// Accepts integers and integral floats such as `1500.0`.
fn whole_meters(accuracy: f64) -> Option<u32> {
    if !accuracy.is_finite() || accuracy < 0.0 || accuracy.fract() != 0.0 {
        return None;
    }
    if accuracy > f64::from(u32::MAX) {
        return None;
    }
    Some(accuracy as u32)
}

/// REST provider; answers are cached in the `unwiredlabs` tier.
pub struct UnwiredLabsProvider {
    http_client: Client,
    url: String,
    token: String,
    timeout_ms: u64,
}

impl UnwiredLabsProvider {
    /// Builds a client for `config` using `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the HTTP client cannot be
    /// constructed.
    pub fn new(
        config: &UnwiredLabsConfig,
        token: impl Into<String>,
        timeout_ms: u64,
    ) -> Result<Self, ProviderError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ProviderError::InvalidConfig("empty API token".into()));
        }

        let timeout = Duration::from_millis(timeout_ms);
        let http_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ProviderError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            http_client,
            url: config.url.clone(),
            token,
            timeout_ms,
        })
    }

    fn request_body(&self, key: &CellKey) -> RequestBody<'_> {
        RequestBody {
            token: &self.token,
            mcc: key.mcc(),
            mnc: key.mnc(),
            cells: [RequestCell {
                lac: key.lac(),
                cid: key.cell_id(),
            }],
        }
    }
}

#[async_trait]
impl LocationProvider for UnwiredLabsProvider {
    fn id(&self) -> &'static str {
        "unwiredlabs"
    }

    fn cache_tier(&self) -> TierId {
        TierId::UnwiredLabs
    }

    #[instrument(skip(self, key), fields(provider = "unwiredlabs", key = %key))]
    async fn locate(&self, key: &CellKey) -> ProviderOutcome {
        let response = match self
            .http_client
            .post(&self.url)
            .json(&self.request_body(key))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                let e = ProviderError::from_reqwest(e, self.timeout_ms);
                warn!(error = %e, "provider request failed");
                return ProviderOutcome::TransportError(e);
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                return ProviderOutcome::TransportError(ProviderError::from_reqwest(
                    e,
                    self.timeout_ms,
                ));
            }
        };

        let outcome = decode_body(&body);
        if status.is_success() {
            return outcome;
        }
        match outcome {
            ProviderOutcome::QuotaExceeded | ProviderOutcome::NotFound => outcome,
            _ => {
                warn!(status = status.as_u16(), "provider returned error status");
                ProviderOutcome::TransportError(ProviderError::HttpStatus {
                    status: status.as_u16(),
                })
            }
        }
    }
}
