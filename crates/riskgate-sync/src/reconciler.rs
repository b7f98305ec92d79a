//! Per-tier reconciliation pass.
//!
//! Each pass checkpoints the expected membership, diffs it against a fresh
//! read of the remote list and sends at most one incremental patch. After a
//! successful write the list is re-read once; a mismatch marks the tier as
//! drifted and is left for an operator or a later recheck.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use riskgate_core::{
    ExpectedState, ListDiff, ListPatch, ListReplacement, ListStore, PatchItem, RiskTier,
    StoreError, SyncState,
};
use tracing::{error, info, warn};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::fetch_remote_state;
use crate::report::{ReconcileMethod, TierOutcome};
use crate::store::SnapshotRepository;

/// Drives the remote lists toward their expected membership.
#[derive(Clone)]
pub struct Reconciler {
    list_store: Arc<dyn ListStore>,
    repository: SnapshotRepository,
    config: Arc<SyncConfig>,
}

impl Reconciler {
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

    /// Reconcile one tier against `expected`.
    ///
    /// Never fails: every error is captured in the returned outcome so the
    /// remaining tiers still run.
    pub async fn reconcile_tier(&self, tier: RiskTier, expected: BTreeSet<String>) -> TierOutcome {
        let list_id = self.config.lists.list_id(tier);
        let total_expected = expected.len();

        match self.run_pass(tier, list_id, expected).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(tier = %tier, list_id, error = %e, "Tier reconciliation failed");
                TierOutcome::failed(tier, list_id, total_expected, e)
            }
        }
    }

    async fn run_pass(
        &self,
        tier: RiskTier,
        list_id: &str,
        expected: BTreeSet<String>,
    ) -> SyncResult<TierOutcome> {
        let now = Utc::now();

        // Checkpoint before touching the remote side.
        let mut state = match self.repository.load_expected(tier).await {
            Ok(prior) => ExpectedState::refreshed(prior.as_ref(), tier, expected, now),
            Err(StoreError::Serialization(e)) => {
                // Unknown prior outcome: let this pass settle it.
                warn!(
                    tier = %tier,
                    error = %e,
                    "Stored expected state is unreadable, overwriting"
                );
                let mut state = ExpectedState::new(tier, expected, now);
                state.begin_write(now);
                state
            }
            Err(e) => return Err(e.into()),
        };
        self.repository.save_expected(&state).await?;

        let remote = fetch_remote_state(
            self.list_store.as_ref(),
            list_id,
            &self.config.list_pagination,
        )
        .await?;
        let diff = ListDiff::compute(&state.identifiers, &remote.identifiers());

        let mut outcome = TierOutcome {
            tier,
            list_id: list_id.to_string(),
            success: true,
            added: 0,
            removed: 0,
            total_expected: state.identifiers.len(),
            method: ReconcileMethod::None,
            error: None,
            drift_detected: false,
            state: None,
        };

        if diff.is_empty() {
            if matches!(state.sync, SyncState::PendingWrite { .. }) {
                info!(tier = %tier, list_id, "Interrupted write already landed");
                state.confirm_converged();
                self.repository.save_expected(&state).await?;
            }
            info!(
                tier = %tier,
                list_id,
                count = state.identifiers.len(),
                "Remote list already in sync"
            );
            outcome.state = Some(state.sync);
            return Ok(outcome);
        }

        state.begin_write(Utc::now());
        self.repository.save_expected(&state).await?;

        let patch = ListPatch::from_diff(&diff, &self.item_description(tier, now));
        outcome.method = ReconcileMethod::Incremental;
        outcome.added = patch.append.len();
        outcome.removed = patch.remove.len();

        if let Err(e) = self.list_store.apply_incremental(list_id, &patch).await {
            warn!(
                tier = %tier,
                list_id,
                added = outcome.added,
                removed = outcome.removed,
                error = %e,
                "Incremental update rejected"
            );
            outcome.success = false;
            outcome.error = Some(e.to_string());
            outcome.state = Some(state.sync);
            return Ok(outcome);
        }

        info!(
            tier = %tier,
            list_id,
            added = outcome.added,
            removed = outcome.removed,
            "Applied incremental update"
        );

        if self.config.verify_after_write {
            self.verify(&mut state, list_id, &mut outcome).await?;
        } else {
            state.confirm_converged();
        }

        self.repository.save_expected(&state).await?;
        outcome.state = Some(state.sync);
        Ok(outcome)
    }

    /// Full replacement of a tier's list from its stored snapshot.
    ///
    /// Sends the whole membership in one request, then always verifies.
    #[deprecated(note = "use the incremental reconciliation pass; kept for manual full resync")]
    pub async fn replace_tier(&self, tier: RiskTier) -> SyncResult<TierOutcome> {
        let list_id = self.config.lists.list_id(tier);
        warn!(
            tier = %tier,
            list_id,
            "Full list replacement is deprecated, prefer incremental reconciliation"
        );

        let mut state = self
            .repository
            .load_expected(tier)
            .await?
            .ok_or(SyncError::MissingExpectedState(tier))?;
        let now = Utc::now();
        state.begin_write(now);
        self.repository.save_expected(&state).await?;

        let description = self.item_description(tier, now);
        let replacement = ListReplacement {
            name: format!("{}-{tier}", self.config.label),
            description: format!("{} managed list for {tier} risk users", self.config.label),
            items: state
                .identifiers
                .iter()
                .map(|value| PatchItem {
                    value: value.clone(),
                    description: Some(description.clone()),
                })
                .collect(),
        };

        let mut outcome = TierOutcome {
            tier,
            list_id: list_id.to_string(),
            success: true,
            added: replacement.items.len(),
            removed: 0,
            total_expected: state.identifiers.len(),
            method: ReconcileMethod::FullReplace,
            error: None,
            drift_detected: false,
            state: None,
        };

        if let Err(e) = self.list_store.replace_all(list_id, &replacement).await {
            warn!(tier = %tier, list_id, error = %e, "Full list replacement rejected");
            outcome.success = false;
            outcome.error = Some(e.to_string());
            outcome.state = Some(state.sync);
            return Ok(outcome);
        }
        info!(tier = %tier, list_id, count = outcome.added, "Replaced remote list");

        self.verify(&mut state, list_id, &mut outcome).await?;
        self.repository.save_expected(&state).await?;
        outcome.state = Some(state.sync);
        Ok(outcome)
    }

    /// Wait for propagation, re-read the list and settle the sync state.
    async fn verify(
        &self,
        state: &mut ExpectedState,
        list_id: &str,
        outcome: &mut TierOutcome,
    ) -> SyncResult<()> {
        if !self.config.propagation_delay.is_zero() {
            tokio::time::sleep(self.config.propagation_delay).await;
        }

        let remote = match fetch_remote_state(
            self.list_store.as_ref(),
            list_id,
            &self.config.list_pagination,
        )
        .await
        {
            Ok(remote) => remote,
            Err(e) => {
                // The write landed but could not be confirmed; stay pending.
                warn!(tier = %state.tier, list_id, error = %e, "Verification fetch failed");
                outcome.success = false;
                outcome.error = Some(format!("verification failed: {e}"));
                return Ok(());
            }
        };

        let actual = remote.identifiers();
        if actual == state.identifiers {
            state.confirm_converged();
            info!(tier = %state.tier, list_id, count = actual.len(), "Verified remote list");
        } else {
            let diff = ListDiff::compute(&state.identifiers, &actual);
            state.flag_drift(Utc::now())?;
            outcome.drift_detected = true;
            warn!(
                tier = %state.tier,
                list_id,
                missing = diff.to_add.len(),
                unexpected = diff.to_remove.len(),
                "Remote list drifted after write"
            );
        }
        Ok(())
    }

    fn item_description(&self, tier: RiskTier, at: DateTime<Utc>) -> String {
        format!(
            "{}:{tier} risk user (synced {})",
            self.config.label,
            at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("lists", &self.config.lists)
            .finish_non_exhaustive()
    }
}
