//! Prometheus exposition of the engine's execution metrics.

use std::sync::Mutex;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use prometheus_client::registry::Registry;
use riskgate_sync::metrics::ExecutionMetrics;

use crate::state::AppState;

/// Registry owning every exported metric family.
pub struct MetricsRegistry {
    pub registry: Mutex<Registry>,
}

impl MetricsRegistry {
    /// Create a registry with the engine's series registered.
    #[must_use]
    pub fn new(execution: &ExecutionMetrics) -> Self {
        let mut registry = Registry::default();
        execution.register(&mut registry);
        Self {
            registry: Mutex::new(registry),
        }
    }

    /// Encode all registered metrics in text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();
        let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        prometheus_client::encoding::text::encode(&mut buf, &registry)?;
        Ok(buf)
    }
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry").finish_non_exhaustive()
    }
}

/// Handler for `GET /metrics/prometheus`.
pub async fn prometheus_handler(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok(buf) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            buf,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics",
            )
                .into_response()
        }
    }
}
