use std::collections::BTreeMap;
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use cellgeo_api::{ApiError, ApiResponse, HealthBody, LocationBody, LocationQuery, VersionBody};
use cellgeo_resolver::{
    ReconcileError, ReconcileReport, RefreshError, RefreshReport, ResolveError, StatsSnapshot,
};
use cellgeo_storage::{TierAccess, TierId};
use serde::{Deserialize, Serialize};

use crate::state::{AppState, refresh_cutoff};

/// `GET /?mcc=&mnc=&lac=&cellid=`
pub async fn locate(
    State(state): State<AppState>,
    query: Result<Query<LocationQuery>, QueryRejection>,
) -> Result<LocationBody, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let query = query.to_cell_query()?;

    let resolution = state
        .resolver
        .resolve(&query)
        .await
        .map_err(resolve_error)?;
    Ok(LocationBody::from(resolution.record))
}

fn resolve_error(err: ResolveError) -> ApiError {
    match err {
        ResolveError::InvalidInput(e) => ApiError::from(e),
        other => ApiError::internal(other.to_string()),
    }
}

pub async fn healthz() -> ApiResponse<HealthBody> {
    ApiResponse::ok(HealthBody::ok())
}

/// Server version and the age of the authoritative dataset.
pub async fn version(State(state): State<AppState>) -> ApiResponse<VersionBody> {
    let data_version = state
        .tiers()
        .get(TierId::OpenCellId)
        .and_then(|tier| tier.source_modified())
        .map(|modified| modified.unix_timestamp());

    ApiResponse::ok(VersionBody {
        server: env!("CARGO_PKG_VERSION").to_string(),
        data_version,
    })
}

#[derive(Debug, Serialize)]
pub struct TierStatus {
    pub backend: &'static str,
    pub access: TierAccess,
    /// Entry count, `null` if the tier could not be counted
    pub entries: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub resolver: StatsSnapshot,
    pub tiers: BTreeMap<TierId, TierStatus>,
}

pub async fn stats(State(state): State<AppState>) -> ApiResponse<StatsResponse> {
    let mut tiers = BTreeMap::new();
    for tier in state.tiers().iter() {
        let entries = match tier.len().await {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::warn!(tier = %tier.id(), error = %e, "failed to count tier entries");
                None
            }
        };
        tiers.insert(
            tier.id(),
            TierStatus {
                backend: tier.backend_name(),
                access: tier.access(),
                entries,
            },
        );
    }

    ApiResponse::ok(StatsResponse {
        resolver: state.resolver.stats().snapshot(),
        tiers,
    })
}

/// `POST /admin/reconcile/{tier}`
pub async fn reconcile(
    State(state): State<AppState>,
    Path(tier): Path<String>,
) -> Result<ApiResponse<ReconcileReport>, ApiError> {
    let tier: TierId = tier.parse().map_err(ApiError::bad_request)?;

    let report = state.reconciler.sweep(tier).await.map_err(|e| match e {
        ReconcileError::ReadOnlyTier(_) => ApiError::bad_request(e.to_string()),
        ReconcileError::UnknownTier(_) => ApiError::not_found(e.to_string()),
        ReconcileError::Enumerate { .. } => ApiError::internal(e.to_string()),
    })?;
    Ok(ApiResponse::ok(report))
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshParams {
    /// Overrides the configured `refresh.max_age_secs`; 0 refreshes everything
    pub max_age_secs: Option<u64>,
}

/// `POST /admin/refresh/{tier}?max_age_secs=`
pub async fn refresh(
    State(state): State<AppState>,
    Path(tier): Path<String>,
    params: Result<Query<RefreshParams>, QueryRejection>,
) -> Result<ApiResponse<RefreshReport>, ApiError> {
    let tier: TierId = tier.parse().map_err(ApiError::bad_request)?;
    let Query(params) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let max_age = params
        .max_age_secs
        .map_or(state.refresh_max_age, Duration::from_secs);

    let report = state
        .refresher
        .refresh(tier, refresh_cutoff(max_age))
        .await
        .map_err(|e| match e {
            RefreshError::ReadOnlyTier(_) => ApiError::bad_request(e.to_string()),
            RefreshError::UnknownTier(_) | RefreshError::NoProvider(_) => {
                ApiError::not_found(e.to_string())
            }
            RefreshError::Enumerate { .. } => ApiError::internal(e.to_string()),
        })?;
    Ok(ApiResponse::ok(report))
}
