//! Trigger and inspection endpoints.
//!
//! Every handler goes through the shared [`SyncService`](riskgate_sync::SyncService),
//! so manual triggers and the scheduler contend for the same tier leases.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use riskgate_core::RiskTier;
use riskgate_sync::health::HealthReport;
use riskgate_sync::metrics::MetricsSnapshot;
use riskgate_sync::{ConsistencyReport, CycleReport, ListOverview, TierConsistency, TierOutcome};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn parse_tier(raw: &str) -> ApiResult<RiskTier> {
    raw.parse().map_err(|_| ApiError::InvalidTier(raw.to_string()))
}

/// `POST /v1/reconcile`: run one cycle now.
///
/// Returns 200 with the report even when tiers failed.
pub async fn trigger_reconcile(State(state): State<AppState>) -> Json<CycleReport> {
    info!("Manual reconciliation cycle requested");
    Json(state.service.run_cycle().await)
}

/// `POST /v1/reconcile/{tier}/replace`: deprecated full-list replacement.
pub async fn trigger_replace(
    State(state): State<AppState>,
    Path(tier): Path<String>,
) -> ApiResult<Json<TierOutcome>> {
    let tier = parse_tier(&tier)?;
    info!(tier = %tier, "Manual full replacement requested");
    Ok(Json(state.service.replace_tier(tier).await?))
}

/// `GET /v1/consistency`: read-only comparison of snapshots and remote lists.
pub async fn get_consistency(State(state): State<AppState>) -> ApiResult<Json<ConsistencyReport>> {
    Ok(Json(state.service.check_consistency().await?))
}

/// `POST /v1/consistency/{tier}/recheck`: clear drift when the lists match again.
pub async fn recheck_drift(
    State(state): State<AppState>,
    Path(tier): Path<String>,
) -> ApiResult<Json<TierConsistency>> {
    let tier = parse_tier(&tier)?;
    Ok(Json(state.service.recheck_drift(tier).await?))
}

/// `GET /v1/lists`
pub async fn list_overview(State(state): State<AppState>) -> Json<Vec<ListOverview>> {
    Json(state.service.list_overview().await)
}

/// `GET /v1/cycles/last`
pub async fn last_cycle(State(state): State<AppState>) -> ApiResult<Json<CycleReport>> {
    state
        .service
        .last_cycle()
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("cycle report"))
}

/// `GET /health`: 200 when both collaborators answer, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.service.health().await;
    let status = if report.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

/// `GET /metrics`: cumulative execution summary.
pub async fn metrics_summary(State(state): State<AppState>) -> impl IntoResponse {
    Json::<MetricsSnapshot>(state.service.metrics_snapshot())
}
