//! In-memory collaborator fakes for engine tests.
//!
//! [`FakeListStore`] applies patches to in-memory lists so passes converge the
//! way a real store would, and can be told to reject, fail or ignore writes.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use riskgate_core::{
    ClientError, ClientResult, ListPage, ListPatch, ListReplacement, ListStore, Page,
    RemoteListItem, RiskPage, RiskRecord, RiskSource, RiskTier,
};

fn paginate<T: Clone>(items: &[T], page: u32, page_size: u32) -> Page<T> {
    let size = page_size.max(1) as usize;
    let total_pages = u32::try_from(items.len().div_ceil(size))
        .unwrap_or(u32::MAX)
        .max(1);
    let start = (page.saturating_sub(1) as usize).saturating_mul(size);
    let items = items.iter().skip(start).take(size).cloned().collect();
    Page {
        items,
        current_page: page,
        total_pages,
    }
}

/// Build a risk record.
#[must_use]
pub fn record(identifier: &str, tier: RiskTier) -> RiskRecord {
    RiskRecord {
        identifier: identifier.to_string(),
        tier,
        event_count: 1,
        last_event: None,
    }
}

/// Risk source serving a fixed record set.
#[derive(Debug, Default)]
pub struct FakeRiskSource {
    records: Mutex<Vec<RiskRecord>>,
    fail_on_page: Mutex<Option<u32>>,
    unreachable: Mutex<bool>,
    endless: Mutex<bool>,
    pages_requested: AtomicU32,
}

impl FakeRiskSource {
    #[must_use]
    pub fn new(records: Vec<RiskRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub fn set_records(&self, records: Vec<RiskRecord>) {
        *self.records.lock().unwrap() = records;
    }

    /// Fail every request for `page` with a server error.
    pub fn fail_on_page(&self, page: u32) {
        *self.fail_on_page.lock().unwrap() = Some(page);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock().unwrap() = unreachable;
    }

    /// Report one more page than requested on every fetch.
    pub fn endless_pages(&self) {
        *self.endless.lock().unwrap() = true;
    }

    pub fn pages_requested(&self) -> u32 {
        self.pages_requested.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RiskSource for FakeRiskSource {
    async fn fetch_risk_page(&self, page: u32, page_size: u32) -> ClientResult<RiskPage> {
        self.pages_requested.fetch_add(1, Ordering::SeqCst);
        if *self.fail_on_page.lock().unwrap() == Some(page) {
            return Err(ClientError::Server {
                status: 503,
                detail: "risk source unavailable".into(),
            });
        }
        if *self.endless.lock().unwrap() {
            return Ok(Page {
                items: vec![record(&format!("user{page}@example.com"), RiskTier::Low)],
                current_page: page,
                total_pages: page.saturating_add(1),
            });
        }
        Ok(paginate(&self.records.lock().unwrap(), page, page_size))
    }

    async fn ping(&self) -> ClientResult<()> {
        if *self.unreachable.lock().unwrap() {
            return Err(ClientError::Network("connection refused".into()));
        }
        Ok(())
    }
}

/// List store keeping each list as an ordered item vector.
#[derive(Debug, Default)]
pub struct FakeListStore {
    lists: Mutex<BTreeMap<String, Vec<RemoteListItem>>>,
    patches: Mutex<Vec<(String, ListPatch)>>,
    replacements: Mutex<Vec<(String, ListReplacement)>>,
    reject_writes: Mutex<HashSet<String>>,
    ignore_writes: Mutex<HashSet<String>>,
    fail_fetch_page: Mutex<BTreeMap<String, u32>>,
    endless: Mutex<HashSet<String>>,
    fetches: AtomicU32,
}

impl FakeListStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a list's contents directly.
    pub fn set_items(&self, list_id: &str, values: &[&str]) {
        let items = values
            .iter()
            .map(|value| RemoteListItem {
                value: (*value).to_string(),
                description: None,
            })
            .collect();
        self.lists.lock().unwrap().insert(list_id.to_string(), items);
    }

    /// Sorted values currently in a list.
    pub fn values(&self, list_id: &str) -> Vec<String> {
        let mut values: Vec<String> = self
            .lists
            .lock()
            .unwrap()
            .get(list_id)
            .map(|items| items.iter().map(|i| i.value.clone()).collect())
            .unwrap_or_default();
        values.sort();
        values
    }

    pub fn items(&self, list_id: &str) -> Vec<RemoteListItem> {
        self.lists
            .lock()
            .unwrap()
            .get(list_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Patches received, in order.
    pub fn patches(&self) -> Vec<(String, ListPatch)> {
        self.patches.lock().unwrap().clone()
    }

    pub fn replacements(&self) -> Vec<(String, ListReplacement)> {
        self.replacements.lock().unwrap().clone()
    }

    /// Number of writes (patches and replacements) received.
    pub fn write_count(&self) -> usize {
        self.patches.lock().unwrap().len() + self.replacements.lock().unwrap().len()
    }

    /// Number of page fetches served.
    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Answer writes to `list_id` with a rejection.
    pub fn reject_writes(&self, list_id: &str) {
        self.reject_writes.lock().unwrap().insert(list_id.to_string());
    }

    /// Accept writes to `list_id` without applying them.
    pub fn ignore_writes(&self, list_id: &str) {
        self.ignore_writes.lock().unwrap().insert(list_id.to_string());
    }

    /// Fail fetches of `page` for `list_id`.
    pub fn fail_fetch_page(&self, list_id: &str, page: u32) {
        self.fail_fetch_page
            .lock()
            .unwrap()
            .insert(list_id.to_string(), page);
    }

    /// Report one more page than requested for every fetch of `list_id`.
    pub fn endless_pages(&self, list_id: &str) {
        self.endless.lock().unwrap().insert(list_id.to_string());
    }

    fn write_refused(&self, list_id: &str) -> Option<ClientError> {
        self.reject_writes
            .lock()
            .unwrap()
            .contains(list_id)
            .then(|| ClientError::Rejected(format!("10001: list {list_id} is read-only")))
    }

    fn ignores(&self, list_id: &str) -> bool {
        self.ignore_writes.lock().unwrap().contains(list_id)
    }
}

#[async_trait]
impl ListStore for FakeListStore {
    async fn fetch_list_page(
        &self,
        list_id: &str,
        page: u32,
        page_size: u32,
    ) -> ClientResult<ListPage> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch_page.lock().unwrap().get(list_id) == Some(&page) {
            return Err(ClientError::Server {
                status: 500,
                detail: format!("failed to read list {list_id}"),
            });
        }
        if self.endless.lock().unwrap().contains(list_id) {
            return Ok(Page {
                items: vec![RemoteListItem {
                    value: format!("user{page}@example.com"),
                    description: None,
                }],
                current_page: page,
                total_pages: page.saturating_add(1),
            });
        }
        Ok(paginate(&self.items(list_id), page, page_size))
    }

    async fn apply_incremental(&self, list_id: &str, patch: &ListPatch) -> ClientResult<()> {
        self.patches
            .lock()
            .unwrap()
            .push((list_id.to_string(), patch.clone()));
        if let Some(e) = self.write_refused(list_id) {
            return Err(e);
        }
        if self.ignores(list_id) {
            return Ok(());
        }

        let mut lists = self.lists.lock().unwrap();
        let items = lists.entry(list_id.to_string()).or_default();
        items.retain(|item| !patch.remove.contains(&item.value));
        for add in &patch.append {
            if !items.iter().any(|item| item.value == add.value) {
                items.push(RemoteListItem {
                    value: add.value.clone(),
                    description: add.description.clone(),
                });
            }
        }
        Ok(())
    }

    async fn replace_all(&self, list_id: &str, replacement: &ListReplacement) -> ClientResult<()> {
        self.replacements
            .lock()
            .unwrap()
            .push((list_id.to_string(), replacement.clone()));
        if let Some(e) = self.write_refused(list_id) {
            return Err(e);
        }
        if self.ignores(list_id) {
            return Ok(());
        }

        let items = replacement
            .items
            .iter()
            .map(|item| RemoteListItem {
                value: item.value.clone(),
                description: item.description.clone(),
            })
            .collect();
        self.lists.lock().unwrap().insert(list_id.to_string(), items);
        Ok(())
    }

    async fn ping(&self, _list_id: &str) -> ClientResult<()> {
        Ok(())
    }
}
