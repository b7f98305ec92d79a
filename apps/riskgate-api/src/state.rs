//! Shared handler state.

use std::sync::Arc;

use riskgate_sync::SyncService;

use crate::metrics::MetricsRegistry;

#[derive(Clone, Debug)]
pub struct AppState {
    pub service: Arc<SyncService>,
    pub metrics: Arc<MetricsRegistry>,
}

impl AppState {
    #[must_use]
    pub fn new(service: Arc<SyncService>) -> Self {
        let metrics = Arc::new(MetricsRegistry::new(service.metrics()));
        Self { service, metrics }
    }
}
