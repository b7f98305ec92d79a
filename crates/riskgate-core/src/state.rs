//! Expected state snapshot and the per-tier sync state machine.
//!
//! Transitions:
//!
//! ```text
//! Synced       -> PendingWrite   diff detected, write about to be sent
//! PendingWrite -> PendingWrite   pass resumed after a crash or rejected write
//! PendingWrite -> Synced         write verified (or accepted, when verification is off)
//! PendingWrite -> Drifted        verification re-fetch did not match
//! Drifted      -> Drifted        any later reconciliation pass (attempt recorded)
//! Drifted      -> Synced         explicit drift recheck found equality
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::tier::RiskTier;

/// Sync status of one tier's remote list relative to its snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncState {
    /// Remote list matched the snapshot at the last check.
    #[default]
    Synced,
    /// A mutation was decided and may or may not have landed.
    PendingWrite { since: DateTime<Utc> },
    /// Remote did not converge after a write. Cleared only by an explicit recheck.
    Drifted {
        detected_at: DateTime<Utc>,
        last_reconciliation_attempt: DateTime<Utc>,
    },
}

impl SyncState {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::PendingWrite { .. } => "pending_write",
            Self::Drifted { .. } => "drifted",
        }
    }

    #[must_use]
    pub fn is_drifted(&self) -> bool {
        matches!(self, Self::Drifted { .. })
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Authoritative membership for one tier's remote list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedState {
    pub tier: RiskTier,
    pub identifiers: BTreeSet<String>,
    pub last_updated: DateTime<Utc>,
    pub last_attempt: DateTime<Utc>,
    #[serde(default)]
    pub sync: SyncState,
}

impl ExpectedState {
    /// A fresh snapshot with no history.
    #[must_use]
    pub fn new(tier: RiskTier, identifiers: BTreeSet<String>, now: DateTime<Utc>) -> Self {
        Self {
            tier,
            identifiers,
            last_updated: now,
            last_attempt: now,
            sync: SyncState::Synced,
        }
    }

    /// Replace the membership wholesale while carrying the prior sync state.
    #[must_use]
    pub fn refreshed(
        prior: Option<&ExpectedState>,
        tier: RiskTier,
        identifiers: BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut state = Self::new(tier, identifiers, now);
        if let Some(prior) = prior {
            state.sync = prior.sync.clone();
        }
        state
    }

    #[must_use]
    pub fn is_drifted(&self) -> bool {
        self.sync.is_drifted()
    }

    /// Mark that a mutation is about to be sent.
    pub fn begin_write(&mut self, now: DateTime<Utc>) {
        self.last_attempt = now;
        self.sync = match &self.sync {
            SyncState::Synced => SyncState::PendingWrite { since: now },
            SyncState::PendingWrite { since } => SyncState::PendingWrite { since: *since },
            SyncState::Drifted { detected_at, .. } => SyncState::Drifted {
                detected_at: *detected_at,
                last_reconciliation_attempt: now,
            },
        };
    }

    /// Record that remote membership equals the snapshot.
    ///
    /// A drifted tier stays drifted; only [`ExpectedState::clear_drift`] leaves it.
    pub fn confirm_converged(&mut self) {
        if let SyncState::PendingWrite { .. } = self.sync {
            self.sync = SyncState::Synced;
        }
    }

    /// Record a verification mismatch after a write.
    pub fn flag_drift(&mut self, now: DateTime<Utc>) -> Result<(), CoreError> {
        self.sync = match &self.sync {
            SyncState::PendingWrite { .. } => SyncState::Drifted {
                detected_at: now,
                last_reconciliation_attempt: now,
            },
            SyncState::Drifted { detected_at, .. } => SyncState::Drifted {
                detected_at: *detected_at,
                last_reconciliation_attempt: now,
            },
            SyncState::Synced => {
                return Err(CoreError::transition(self.tier, &self.sync, "drifted"));
            }
        };
        Ok(())
    }

    /// Leave the drifted state after an explicit recheck found equality.
    pub fn clear_drift(&mut self) -> Result<(), CoreError> {
        if !self.sync.is_drifted() {
            return Err(CoreError::transition(self.tier, &self.sync, "synced"));
        }
        self.sync = SyncState::Synced;
        Ok(())
    }
}
