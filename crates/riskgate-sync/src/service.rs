//! The reconciliation service shared by the scheduler and manual triggers.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use riskgate_core::{ListStore, RiskRecord, RiskSource, RiskTier, SnapshotStore};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::classify::classify;
use crate::config::SyncConfig;
use crate::consistency::ConsistencyChecker;
use crate::error::{SyncError, SyncResult};
use crate::health::{probe, HealthReport, DEFAULT_CHECK_TIMEOUT};
use crate::metrics::{ExecutionMetrics, MetricsSnapshot};
use crate::reconciler::Reconciler;
use crate::remote::fetch_remote_state;
use crate::report::{ConsistencyReport, CycleReport, ListOverview, TierConsistency, TierOutcome};
use crate::store::{SnapshotRepository, TierLease};

/// Reconciliation engine with its collaborators.
///
/// Build one per process and share it behind an `Arc`.
pub struct SyncService {
    risk_source: Arc<dyn RiskSource>,
    list_store: Arc<dyn ListStore>,
    repository: SnapshotRepository,
    config: Arc<SyncConfig>,
    reconciler: Reconciler,
    checker: ConsistencyChecker,
    metrics: ExecutionMetrics,
}

impl SyncService {
    #[must_use]
    pub fn new(
        risk_source: Arc<dyn RiskSource>,
        list_store: Arc<dyn ListStore>,
        store: Arc<dyn SnapshotStore>,
        config: SyncConfig,
    ) -> Self {
        let config = Arc::new(config);
        let repository = SnapshotRepository::new(store);
        Self {
            reconciler: Reconciler::new(list_store.clone(), repository.clone(), config.clone()),
            checker: ConsistencyChecker::new(list_store.clone(), repository.clone(), config.clone()),
            risk_source,
            list_store,
            repository,
            config,
            metrics: ExecutionMetrics::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    #[must_use]
    pub fn repository(&self) -> &SnapshotRepository {
        &self.repository
    }

    #[must_use]
    pub fn metrics(&self) -> &ExecutionMetrics {
        &self.metrics
    }

    /// Run one full cycle: fetch, classify, reconcile each tier in order.
    ///
    /// Tier failures are reported in the result; only a failed risk fetch
    /// aborts the cycle, and it does so before anything is written.
    #[instrument(skip(self), fields(cycle_id))]
    pub async fn run_cycle(&self) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        tracing::Span::current().record("cycle_id", tracing::field::display(cycle_id));
        let started_at = Utc::now();
        let start = Instant::now();
        info!("Starting reconciliation cycle");

        let (records_fetched, tiers, error) = match self.fetch_risk_records().await {
            Ok(records) => {
                let assignment = classify(&records);
                let mut tiers = Vec::with_capacity(RiskTier::ALL.len());
                for tier in RiskTier::ALL {
                    let expected = assignment.members(tier);
                    let outcome = match self.reconcile_with_lease(tier, expected.clone()).await {
                        Ok(outcome) => outcome,
                        Err(e) => TierOutcome::failed(
                            tier,
                            self.config.lists.list_id(tier),
                            expected.len(),
                            e,
                        ),
                    };
                    tiers.push(outcome);
                }
                (records.len(), tiers, None)
            }
            Err(e) => {
                error!(error = %e, "Risk fetch failed, aborting cycle");
                (0, Vec::new(), Some(e.to_string()))
            }
        };

        let success = error.is_none() && tiers.iter().all(|t| t.success);
        let report = CycleReport {
            cycle_id,
            started_at,
            finished_at: Utc::now(),
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            records_fetched,
            tiers,
            success,
            error,
        };

        self.metrics.record(&report);
        if let Err(e) = self.repository.save_last_cycle(&report).await {
            warn!(error = %e, "Failed to persist cycle report");
        }

        if report.success {
            info!(
                records = report.records_fetched,
                duration_ms = report.duration_ms,
                "Reconciliation cycle complete"
            );
        } else {
            warn!(
                records = report.records_fetched,
                duration_ms = report.duration_ms,
                failed_tiers = report.failed_tiers().count(),
                "Reconciliation cycle finished with failures"
            );
        }
        report
    }

    /// All risk records, in fetch order.
    ///
    /// Any page failure fails the fetch, as does hitting the page bound.
    pub async fn fetch_risk_records(&self) -> SyncResult<Vec<RiskRecord>> {
        let source = self.risk_source.as_ref();
        let records = self
            .config
            .risk_pagination
            .fetch_all_strict("risk-scores", |page, page_size| {
                source.fetch_risk_page(page, page_size)
            })
            .await?;
        info!(count = records.len(), "Fetched risk records");
        Ok(records)
    }

    /// Reconcile one tier while holding its lease.
    pub async fn reconcile_with_lease(
        &self,
        tier: RiskTier,
        expected: std::collections::BTreeSet<String>,
    ) -> SyncResult<TierOutcome> {
        let lease = self.acquire(tier).await?;
        let outcome = self.reconciler.reconcile_tier(tier, expected).await;
        self.release(lease).await;
        Ok(outcome)
    }

    /// Replace a tier's list wholesale from its snapshot.
    ///
    /// Manual full resync only; the scheduler never calls this.
    pub async fn replace_tier(&self, tier: RiskTier) -> SyncResult<TierOutcome> {
        let lease = self.acquire(tier).await?;
        #[allow(deprecated)]
        let result = self.reconciler.replace_tier(tier).await;
        self.release(lease).await;
        result
    }

    /// Compare every snapshot with its remote list. Read-only.
    pub async fn check_consistency(&self) -> SyncResult<ConsistencyReport> {
        self.checker.check_all().await
    }

    /// Explicit drift recheck for one tier.
    pub async fn recheck_drift(&self, tier: RiskTier) -> SyncResult<TierConsistency> {
        let lease = self.acquire(tier).await?;
        let result = self.checker.recheck_drift(tier).await;
        self.release(lease).await;
        result
    }

    /// Current contents of all three lists, fetched concurrently.
    pub async fn list_overview(&self) -> Vec<ListOverview> {
        let fetches = RiskTier::ALL.map(|tier| async move {
            let list_id = self.config.lists.list_id(tier);
            match fetch_remote_state(
                self.list_store.as_ref(),
                list_id,
                &self.config.list_pagination,
            )
            .await
            {
                Ok(remote) => ListOverview {
                    tier,
                    list_id: list_id.to_string(),
                    count: remote.len(),
                    items: remote.items,
                    error: None,
                },
                Err(e) => ListOverview {
                    tier,
                    list_id: list_id.to_string(),
                    count: 0,
                    items: Vec::new(),
                    error: Some(e.to_string()),
                },
            }
        });
        join_all(fetches).await
    }

    /// Reachability of both collaborators.
    pub async fn health(&self) -> HealthReport {
        probe(
            self.risk_source.as_ref(),
            self.list_store.as_ref(),
            self.config.lists.list_id(RiskTier::Low),
            DEFAULT_CHECK_TIMEOUT,
        )
        .await
    }

    #[must_use]
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Most recent persisted cycle report.
    pub async fn last_cycle(&self) -> SyncResult<Option<CycleReport>> {
        Ok(self.repository.load_last_cycle().await?)
    }

    async fn acquire(&self, tier: RiskTier) -> SyncResult<TierLease> {
        match TierLease::acquire(self.repository.store(), tier, self.config.lease_ttl).await? {
            Some(lease) => Ok(lease),
            None => {
                warn!(tier = %tier, "Tier is locked by another pass, skipping");
                Err(SyncError::LeaseHeld(tier))
            }
        }
    }

    async fn release(&self, lease: TierLease) {
        let tier = lease.tier();
        if let Err(e) = lease.release(self.repository.store()).await {
            // The TTL reclaims it eventually.
            warn!(tier = %tier, error = %e, "Failed to release tier lease");
        }
    }
}

impl std::fmt::Debug for SyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
