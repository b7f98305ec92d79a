//! Comparison of stored snapshots with the remote lists.
//!
//! [`ConsistencyChecker::check_all`] and [`ConsistencyChecker::check_tier`]
//! never write anything. [`ConsistencyChecker::recheck_drift`] is the one
//! operation allowed to move a tier out of the drifted state.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use riskgate_core::{ExpectedState, ListStore, RiskTier};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::fetch_remote_state;
use crate::report::{ConsistencyReport, TierConsistency};
use crate::store::SnapshotRepository;

#[derive(Clone)]
pub struct ConsistencyChecker {
    list_store: Arc<dyn ListStore>,
    repository: SnapshotRepository,
    config: Arc<SyncConfig>,
}

impl ConsistencyChecker {
    #[must_use]
    pub fn new(
        list_store: Arc<dyn ListStore>,
        repository: SnapshotRepository,
        config: Arc<SyncConfig>,
    ) -> Self {
        Self {
            list_store,
            repository,
            config,
        }
    }

    /// Check every tier that has a snapshot. Read-only.
    ///
    /// A tier whose snapshot cannot be read is reported as inconsistent with
    /// its error; the other tiers are still checked.
    pub async fn check_all(&self) -> SyncResult<ConsistencyReport> {
        let mut tiers = Vec::with_capacity(RiskTier::ALL.len());
        for tier in RiskTier::ALL {
            match self.check_tier(tier).await {
                Ok(Some(result)) => tiers.push(result),
                Ok(None) => {}
                Err(e) => {
                    warn!(tier = %tier, error = %e, "Failed to load expected state");
                    tiers.push(self.unreadable(tier, &e));
                }
            }
        }

        let report = ConsistencyReport::new(Utc::now(), tiers);
        info!(
            checked = report.tiers.len(),
            all_consistent = report.all_consistent,
            "Consistency check complete"
        );
        Ok(report)
    }

    /// Check one tier. `None` when no snapshot exists yet. Read-only.
    pub async fn check_tier(&self, tier: RiskTier) -> SyncResult<Option<TierConsistency>> {
        let Some(state) = self.repository.load_expected(tier).await? else {
            debug!(tier = %tier, "No expected state, skipping consistency check");
            return Ok(None);
        };
        Ok(Some(self.compare(&state).await))
    }

    /// Re-compare a tier and clear its drift flag when the lists now match.
    pub async fn recheck_drift(&self, tier: RiskTier) -> SyncResult<TierConsistency> {
        let mut state = self
            .repository
            .load_expected(tier)
            .await?
            .ok_or(SyncError::MissingExpectedState(tier))?;

        let mut result = self.compare(&state).await;
        if result.consistent && state.is_drifted() {
            state.clear_drift()?;
            self.repository.save_expected(&state).await?;
            result.drift_flagged = false;
            info!(tier = %tier, list_id = %result.list_id, "Drift cleared after recheck");
        } else if !result.consistent {
            warn!(
                tier = %tier,
                list_id = %result.list_id,
                expected = result.expected_count,
                actual = result.actual_count,
                "Tier still inconsistent after recheck"
            );
        }
        Ok(result)
    }

    fn unreadable(&self, tier: RiskTier, error: &SyncError) -> TierConsistency {
        TierConsistency {
            tier,
            list_id: self.config.lists.list_id(tier).to_string(),
            consistent: false,
            expected_count: 0,
            actual_count: 0,
            expected_identifiers: BTreeSet::new(),
            actual_identifiers: BTreeSet::new(),
            last_updated: Utc::now(),
            drift_flagged: false,
            error: Some(error.to_string()),
        }
    }

    async fn compare(&self, state: &ExpectedState) -> TierConsistency {
        let list_id = self.config.lists.list_id(state.tier);
        let mut result = TierConsistency {
            tier: state.tier,
            list_id: list_id.to_string(),
            consistent: false,
            expected_count: state.identifiers.len(),
            actual_count: 0,
            expected_identifiers: state.identifiers.clone(),
            actual_identifiers: BTreeSet::new(),
            last_updated: state.last_updated,
            drift_flagged: state.is_drifted(),
            error: None,
        };

        match fetch_remote_state(
            self.list_store.as_ref(),
            list_id,
            &self.config.list_pagination,
        )
        .await
        {
            Ok(remote) => {
                let actual = remote.identifiers();
                // Sizes first: most mismatches are additions or removals.
                result.consistent =
                    actual.len() == state.identifiers.len() && actual == state.identifiers;
                result.actual_count = actual.len();
                result.actual_identifiers = actual;
            }
            Err(e) => {
                warn!(tier = %state.tier, list_id, error = %e, "Consistency fetch failed");
                result.error = Some(e.to_string());
            }
        }
        result
    }
}

impl std::fmt::Debug for ConsistencyChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsistencyChecker")
            .field("lists", &self.config.lists)
            .finish_non_exhaustive()
    }
}
