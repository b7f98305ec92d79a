//! Engine error type.

use riskgate_core::{ClientError, CoreError, RiskTier, StoreError};
use thiserror::Error;

/// Errors raised while reconciling or checking a tier.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Risk source or list store call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Snapshot store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Domain rule violated.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Another pass currently owns this tier.
    #[error("tier {0} is locked by another reconciliation pass")]
    LeaseHeld(RiskTier),

    /// A collection could only be partially read; it is not safe to act on.
    #[error("incomplete fetch of {resource}: {reason}")]
    IncompleteFetch { resource: String, reason: String },

    /// No snapshot has been written for this tier yet.
    #[error("no expected state recorded for tier {0}")]
    MissingExpectedState(RiskTier),
}

/// Result alias for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;
