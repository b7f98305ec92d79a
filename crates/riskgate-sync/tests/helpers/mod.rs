//! Shared fixtures for engine tests.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use riskgate_core::{RiskRecord, SnapshotStore};
use riskgate_sync::store::MemorySnapshotStore;
use riskgate_sync::testing::{FakeListStore, FakeRiskSource};
use riskgate_sync::{SyncConfig, SyncService, TierLists};

pub const LOW: &str = "list-low";
pub const MEDIUM: &str = "list-medium";
pub const HIGH: &str = "list-high";

static LOGGING: Once = Once::new();

pub fn init_logging() {
    LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("riskgate_sync=debug")
            .with_test_writer()
            .try_init();
    });
}

pub fn config() -> SyncConfig {
    SyncConfig::new(TierLists::new(LOW, MEDIUM, HIGH)).without_delays()
}

/// A service wired to in-memory fakes.
pub struct Harness {
    pub risk: Arc<FakeRiskSource>,
    pub lists: Arc<FakeListStore>,
    pub store: Arc<MemorySnapshotStore>,
    pub service: SyncService,
}

impl Harness {
    pub fn new(records: Vec<RiskRecord>) -> Self {
        Self::with_config(records, config())
    }

    pub fn with_config(records: Vec<RiskRecord>, config: SyncConfig) -> Self {
        init_logging();
        let risk = Arc::new(FakeRiskSource::new(records));
        let lists = Arc::new(FakeListStore::new());
        let store = Arc::new(MemorySnapshotStore::new());
        let service = SyncService::new(
            risk.clone(),
            lists.clone(),
            store.clone() as Arc<dyn SnapshotStore>,
            config,
        );
        Self {
            risk,
            lists,
            store,
            service,
        }
    }
}
