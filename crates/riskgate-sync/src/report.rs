//! Results returned by reconciliation passes, cycles and consistency checks.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use riskgate_core::{RemoteListItem, RiskTier, SyncState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a tier's remote list was brought in line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMethod {
    /// No mutation was needed (or none was attempted).
    None,
    /// One append/remove patch.
    Incremental,
    /// Whole-list replacement.
    FullReplace,
}

/// Result of one tier's reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierOutcome {
    pub tier: RiskTier,
    pub list_id: String,
    pub success: bool,
    /// Items added (or attempted, when the write failed).
    pub added: usize,
    /// Items removed (or attempted, when the write failed).
    pub removed: usize,
    pub total_expected: usize,
    pub method: ReconcileMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub drift_detected: bool,
    /// Sync state after the pass; absent when the pass failed before the snapshot was read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<SyncState>,
}

impl TierOutcome {
    pub(crate) fn failed(
        tier: RiskTier,
        list_id: &str,
        total_expected: usize,
        error: impl ToString,
    ) -> Self {
        Self {
            tier,
            list_id: list_id.to_string(),
            success: false,
            added: 0,
            removed: 0,
            total_expected,
            method: ReconcileMethod::None,
            error: Some(error.to_string()),
            drift_detected: false,
            state: None,
        }
    }
}

/// Result of one full cycle over all tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub records_fetched: usize,
    pub tiers: Vec<TierOutcome>,
    /// Every tier succeeded and the risk fetch did not abort the cycle.
    pub success: bool,
    /// Cycle-level failure (risk fetch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CycleReport {
    /// Tiers that did not succeed.
    pub fn failed_tiers(&self) -> impl Iterator<Item = &TierOutcome> {
        self.tiers.iter().filter(|t| !t.success)
    }

    #[must_use]
    pub fn outcome(&self, tier: RiskTier) -> Option<&TierOutcome> {
        self.tiers.iter().find(|t| t.tier == tier)
    }
}

/// Comparison of one tier's snapshot with its remote list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConsistency {
    pub tier: RiskTier,
    pub list_id: String,
    pub consistent: bool,
    pub expected_count: usize,
    pub actual_count: usize,
    pub expected_identifiers: BTreeSet<String>,
    pub actual_identifiers: BTreeSet<String>,
    pub last_updated: DateTime<Utc>,
    pub drift_flagged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Consistency of every tier that has a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub checked_at: DateTime<Utc>,
    /// Tiers without a snapshot are omitted.
    pub tiers: Vec<TierConsistency>,
    pub all_consistent: bool,
}

impl ConsistencyReport {
    #[must_use]
    pub fn new(checked_at: DateTime<Utc>, tiers: Vec<TierConsistency>) -> Self {
        let all_consistent = tiers.iter().all(|t| t.consistent);
        Self {
            checked_at,
            tiers,
            all_consistent,
        }
    }

    #[must_use]
    pub fn tier(&self, tier: RiskTier) -> Option<&TierConsistency> {
        self.tiers.iter().find(|t| t.tier == tier)
    }
}

/// Current contents of one remote list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOverview {
    pub tier: RiskTier,
    pub list_id: String,
    pub count: usize,
    pub items: Vec<RemoteListItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
