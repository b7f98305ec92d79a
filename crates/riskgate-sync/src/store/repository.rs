//! Typed access to snapshots held in a [`SnapshotStore`].

use std::sync::Arc;
use std::time::Duration;

use riskgate_core::{ExpectedState, RiskTier, SnapshotStore, StoreResult};
use tracing::debug;

use crate::report::CycleReport;

const LAST_CYCLE_KEY: &str = "cycle:last";
const LAST_CYCLE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Key under which a tier's expected state lives.
#[must_use]
pub fn expected_state_key(tier: RiskTier) -> String {
    format!("expected_state:{tier}")
}

/// Serializes domain snapshots to JSON strings.
#[derive(Clone)]
pub struct SnapshotRepository {
    store: Arc<dyn SnapshotStore>,
}

impl SnapshotRepository {
    #[must_use]
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    pub async fn load_expected(&self, tier: RiskTier) -> StoreResult<Option<ExpectedState>> {
        match self.store.get(&expected_state_key(tier)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Persist a tier's expected state. Never expires.
    pub async fn save_expected(&self, state: &ExpectedState) -> StoreResult<()> {
        let raw = serde_json::to_string(state)?;
        self.store
            .put(&expected_state_key(state.tier), raw, None)
            .await?;
        debug!(
            tier = %state.tier,
            count = state.identifiers.len(),
            sync = %state.sync,
            "Saved expected state"
        );
        Ok(())
    }

    pub async fn save_last_cycle(&self, report: &CycleReport) -> StoreResult<()> {
        let raw = serde_json::to_string(report)?;
        self.store
            .put(LAST_CYCLE_KEY, raw, Some(LAST_CYCLE_TTL))
            .await
    }

    pub async fn load_last_cycle(&self) -> StoreResult<Option<CycleReport>> {
        match self.store.get(LAST_CYCLE_KEY).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for SnapshotRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotRepository").finish_non_exhaustive()
    }
}
