//! Engine settings.

use std::time::Duration;

use riskgate_core::RiskTier;

use crate::paginate::Paginator;

/// Remote list identifier for each tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierLists {
    pub low: String,
    pub medium: String,
    pub high: String,
}

impl TierLists {
    #[must_use]
    pub fn new(low: impl Into<String>, medium: impl Into<String>, high: impl Into<String>) -> Self {
        Self {
            low: low.into(),
            medium: medium.into(),
            high: high.into(),
        }
    }

    #[must_use]
    pub fn list_id(&self, tier: RiskTier) -> &str {
        match tier {
            RiskTier::Low => &self.low,
            RiskTier::Medium => &self.medium,
            RiskTier::High => &self.high,
        }
    }
}

/// Settings for the reconciliation engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub lists: TierLists,
    /// Pagination for the risk source (safety bound: 100 pages).
    pub risk_pagination: Paginator,
    /// Pagination for list items (safety bound: 50 pages).
    pub list_pagination: Paginator,
    /// Re-fetch and compare after every successful write.
    pub verify_after_write: bool,
    /// Wait before the verification re-fetch.
    pub propagation_delay: Duration,
    /// Lifetime of a per-tier lease; bounds how long a crashed holder blocks a tier.
    pub lease_ttl: Duration,
    /// Prefix for list names and item descriptions.
    pub label: String,
}

impl SyncConfig {
    #[must_use]
    pub fn new(lists: TierLists) -> Self {
        Self {
            lists,
            risk_pagination: Paginator::risk_scores(),
            list_pagination: Paginator::list_items(),
            verify_after_write: true,
            propagation_delay: Duration::from_secs(2),
            lease_ttl: Duration::from_secs(15 * 60),
            label: "riskgate".to_string(),
        }
    }

    /// Settings with every delay removed, for tests and local runs.
    #[must_use]
    pub fn without_delays(mut self) -> Self {
        self.risk_pagination.inter_page_delay = Duration::ZERO;
        self.list_pagination.inter_page_delay = Duration::ZERO;
        self.propagation_delay = Duration::ZERO;
        self
    }
}
