//! Route table.

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::metrics::prometheus_handler;
use crate::state::AppState;

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/reconcile", post(handlers::trigger_reconcile))
        .route("/v1/reconcile/:tier/replace", post(handlers::trigger_replace))
        .route("/v1/consistency", get(handlers::get_consistency))
        .route(
            "/v1/consistency/:tier/recheck",
            post(handlers::recheck_drift),
        )
        .route("/v1/lists", get(handlers::list_overview))
        .route("/v1/cycles/last", get(handlers::last_cycle))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics_summary))
        .route("/metrics/prometheus", get(prometheus_handler))
        .with_state(state)
}
