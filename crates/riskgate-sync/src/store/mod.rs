//! Snapshot persistence.
//!
//! [`SnapshotStore`](riskgate_core::SnapshotStore) backends plus the typed
//! [`SnapshotRepository`] and the per-tier [`TierLease`] built on top of them.

mod lease;
mod memory;
mod postgres;
mod repository;

pub use lease::TierLease;
pub use memory::MemorySnapshotStore;
pub use postgres::PgSnapshotStore;
pub use repository::SnapshotRepository;
