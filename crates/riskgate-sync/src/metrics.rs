//! Cycle execution metrics.
//!
//! Cumulative counters are kept in-process for the JSON summary and mirrored
//! into `prometheus-client` families for scraping.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;
use riskgate_core::RiskTier;
use serde::Serialize;

use crate::report::CycleReport;

/// Labels for cycle counters.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct CycleLabels {
    pub outcome: String,
}

/// Labels for per-tier counters.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct TierLabels {
    pub tier: String,
}

/// Cumulative execution summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub average_duration_ms: f64,
    pub last_run_at: Option<DateTime<Utc>>,
}

/// Execution metrics shared by every cycle entry point.
pub struct ExecutionMetrics {
    summary: Mutex<MetricsSnapshot>,
    cycles: Family<CycleLabels, Counter>,
    cycle_duration_seconds: Histogram,
    items_added: Family<TierLabels, Counter>,
    items_removed: Family<TierLabels, Counter>,
    drift_detected: Family<TierLabels, Counter>,
}

impl ExecutionMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            summary: Mutex::new(MetricsSnapshot::default()),
            cycles: Family::default(),
            // Cycles include propagation delays, so buckets start at a second.
            cycle_duration_seconds: Histogram::new(
                [1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0].into_iter(),
            ),
            items_added: Family::default(),
            items_removed: Family::default(),
            drift_detected: Family::default(),
        }
    }

    /// Register all series under the `riskgate` prefix.
    pub fn register(&self, registry: &mut Registry) {
        let registry = registry.sub_registry_with_prefix("riskgate");
        registry.register(
            "cycles",
            "Reconciliation cycles by outcome",
            self.cycles.clone(),
        );
        registry.register(
            "cycle_duration_seconds",
            "Reconciliation cycle duration in seconds",
            self.cycle_duration_seconds.clone(),
        );
        registry.register(
            "items_added",
            "Identifiers appended to remote lists",
            self.items_added.clone(),
        );
        registry.register(
            "items_removed",
            "Identifiers removed from remote lists",
            self.items_removed.clone(),
        );
        registry.register(
            "drift_detected",
            "Writes whose verification found the remote list drifted",
            self.drift_detected.clone(),
        );
    }

    /// Fold a finished cycle into the totals.
    #[allow(clippy::cast_precision_loss)]
    pub fn record(&self, report: &CycleReport) {
        {
            let mut summary = self.summary.lock().unwrap_or_else(|e| e.into_inner());
            summary.total += 1;
            if report.success {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            let n = summary.total as f64;
            summary.average_duration_ms +=
                (report.duration_ms as f64 - summary.average_duration_ms) / n;
            summary.last_run_at = Some(report.finished_at);
        }

        let outcome = if report.success { "success" } else { "failure" };
        self.cycles
            .get_or_create(&CycleLabels {
                outcome: outcome.to_string(),
            })
            .inc();
        self.cycle_duration_seconds
            .observe(report.duration_ms as f64 / 1000.0);

        for tier in &report.tiers {
            let labels = tier_labels(tier.tier);
            if tier.success {
                self.items_added
                    .get_or_create(&labels)
                    .inc_by(tier.added as u64);
                self.items_removed
                    .get_or_create(&labels)
                    .inc_by(tier.removed as u64);
            }
            if tier.drift_detected {
                self.drift_detected.get_or_create(&labels).inc();
            }
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.summary
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for ExecutionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExecutionMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionMetrics")
            .field("summary", &self.snapshot())
            .finish_non_exhaustive()
    }
}

fn tier_labels(tier: RiskTier) -> TierLabels {
    TierLabels {
        tier: tier.as_str().to_string(),
    }
}
