//! Classification of risk records into per-tier membership sets.

use std::collections::{BTreeMap, BTreeSet};

use riskgate_core::{RiskRecord, RiskTier};
use tracing::debug;

/// Membership of every tier for one cycle. Each identifier belongs to exactly one tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierAssignment {
    members: BTreeMap<RiskTier, BTreeSet<String>>,
}

impl TierAssignment {
    /// Members of `tier`; empty when no user currently has that classification.
    #[must_use]
    pub fn members(&self, tier: RiskTier) -> BTreeSet<String> {
        self.members.get(&tier).cloned().unwrap_or_default()
    }

    /// Tier an identifier was assigned to, if any.
    #[must_use]
    pub fn tier_of(&self, identifier: &str) -> Option<RiskTier> {
        self.members
            .iter()
            .find(|(_, ids)| ids.contains(identifier))
            .map(|(tier, _)| *tier)
    }

    /// Number of distinct identifiers across all tiers.
    #[must_use]
    pub fn total(&self) -> usize {
        self.members.values().map(BTreeSet::len).sum()
    }
}

/// Group records by tier.
///
/// When an identifier appears more than once, the last record in fetch order wins.
#[must_use]
pub fn classify(records: &[RiskRecord]) -> TierAssignment {
    let mut latest: BTreeMap<&str, RiskTier> = BTreeMap::new();
    for record in records {
        if let Some(previous) = latest.insert(record.identifier.as_str(), record.tier) {
            if previous != record.tier {
                debug!(
                    identifier = %record.identifier,
                    previous = %previous,
                    current = %record.tier,
                    "Duplicate risk record, keeping the later classification"
                );
            }
        }
    }

    let mut members: BTreeMap<RiskTier, BTreeSet<String>> =
        RiskTier::ALL.iter().map(|t| (*t, BTreeSet::new())).collect();
    for (identifier, tier) in latest {
        members
            .entry(tier)
            .or_default()
            .insert(identifier.to_string());
    }

    TierAssignment { members }
}
