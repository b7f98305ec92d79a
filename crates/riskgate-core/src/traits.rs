//! Collaborator contracts.
//!
//! The engine only talks to the outside world through these traits. HTTP
//! implementations live in `riskgate-client`; snapshot backends live in
//! `riskgate-sync`.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ClientResult, StoreResult};
use crate::types::{ListPage, ListPatch, ListReplacement, RiskPage};

/// Source of per-user risk classifications.
#[async_trait]
pub trait RiskSource: Send + Sync {
    /// Fetch one page (1-based) of risk records.
    async fn fetch_risk_page(&self, page: u32, page_size: u32) -> ClientResult<RiskPage>;

    /// Lightweight reachability check.
    async fn ping(&self) -> ClientResult<()>;
}

/// External store holding the per-tier access lists.
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Fetch one page (1-based) of a list's items.
    async fn fetch_list_page(
        &self,
        list_id: &str,
        page: u32,
        page_size: u32,
    ) -> ClientResult<ListPage>;

    /// Apply an append/remove delta in one request.
    async fn apply_incremental(&self, list_id: &str, patch: &ListPatch) -> ClientResult<()>;

    /// Replace the whole list.
    async fn replace_all(&self, list_id: &str, replacement: &ListReplacement) -> ClientResult<()>;

    /// Lightweight reachability check against one list.
    async fn ping(&self, list_id: &str) -> ClientResult<()>;
}

/// Durable key-value store holding snapshots and leases.
///
/// Expired entries must read as absent.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> StoreResult<()>;

    /// Store `value` only when no live entry exists. Returns whether it was stored.
    async fn put_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> StoreResult<bool>;

    async fn delete(&self, key: &str) -> StoreResult<()>;
}
