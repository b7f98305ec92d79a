//! Riskgate core
//!
//! Domain types and collaborator contracts for reconciling risk-tier access
//! lists. This crate holds no I/O: HTTP clients live in `riskgate-client`,
//! the reconciliation engine and snapshot backends in `riskgate-sync`.

pub mod error;
pub mod state;
pub mod tier;
pub mod traits;
pub mod types;

pub use error::{ClientError, ClientResult, CoreError, StoreError, StoreResult};
pub use state::{ExpectedState, SyncState};
pub use tier::RiskTier;
pub use traits::{ListStore, RiskSource, SnapshotStore};
pub use types::{
    ListDiff, ListPage, ListPatch, ListReplacement, Page, PatchItem, RemoteListItem, RemoteListState,
    RiskPage, RiskRecord,
};
