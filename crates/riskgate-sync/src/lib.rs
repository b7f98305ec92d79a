//! Riskgate reconciliation engine.
//!
//! Keeps three remote access lists (one per [`RiskTier`]) in line with the
//! current risk classification of every user:
//!
//! 1. fetch all risk records ([`paginate`]), classify them by tier ([`classify`]);
//! 2. per tier, persist the expected membership ([`store`]), diff it against the
//!    freshly fetched remote list and apply one incremental patch ([`reconciler`]);
//! 3. re-fetch and flag drift when the remote list did not converge.
//!
//! [`consistency`] compares snapshots and remote lists without mutating either.
//! [`service::SyncService`] ties everything together and is the single instance
//! shared by the scheduler and the manual entry points.
//!
//! [`RiskTier`]: riskgate_core::RiskTier

pub mod classify;
pub mod config;
pub mod consistency;
pub mod error;
pub mod health;
pub mod metrics;
pub mod paginate;
pub mod reconciler;
pub mod remote;
pub mod report;
pub mod service;
pub mod store;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use config::{SyncConfig, TierLists};
pub use error::{SyncError, SyncResult};
pub use report::{
    ConsistencyReport, CycleReport, ListOverview, ReconcileMethod, TierConsistency, TierOutcome,
};
pub use service::SyncService;
