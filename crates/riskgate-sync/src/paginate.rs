//! Page-by-page collection fetching with a hard request bound.
//!
//! Pages are requested in order starting at 1 until the source reports
//! `current_page >= total_pages` or `max_pages` requests have been issued.

use std::future::Future;
use std::time::Duration;

use riskgate_core::{ClientError, ClientResult, Page};

use crate::error::{SyncError, SyncResult};
use tracing::{debug, warn};

/// Pagination settings for one kind of collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    pub page_size: u32,
    /// Hard bound on requests per fetch.
    pub max_pages: u32,
    /// Pause between consecutive page requests.
    pub inter_page_delay: Duration,
}

impl Paginator {
    /// Defaults for risk score collection.
    #[must_use]
    pub const fn risk_scores() -> Self {
        Self {
            page_size: 100,
            max_pages: 100,
            inter_page_delay: Duration::from_millis(50),
        }
    }

    /// Defaults for list item collection.
    #[must_use]
    pub const fn list_items() -> Self {
        Self {
            page_size: 100,
            max_pages: 50,
            inter_page_delay: Duration::from_millis(50),
        }
    }

    /// Fetch every page; any page failure fails the whole fetch, and so does
    /// reaching `max_pages` before the source reports its last page.
    pub async fn fetch_all_strict<T, F, Fut>(&self, resource: &str, fetch: F) -> SyncResult<Vec<T>>
    where
        F: FnMut(u32, u32) -> Fut,
        Fut: Future<Output = ClientResult<Page<T>>>,
    {
        let fetch = self.fetch_all_partial(resource, fetch).await;
        if fetch.truncated {
            return Err(SyncError::IncompleteFetch {
                resource: resource.to_string(),
                reason: format!(
                    "page limit of {} reached with {} item(s)",
                    self.max_pages,
                    fetch.items.len()
                ),
            });
        }
        Ok(fetch.into_result()?)
    }

    /// Fetch every page; a page failure stops pagination and is returned
    /// alongside the items collected so far.
    pub async fn fetch_all_partial<T, F, Fut>(&self, resource: &str, mut fetch: F) -> PartialFetch<T>
    where
        F: FnMut(u32, u32) -> Fut,
        Fut: Future<Output = ClientResult<Page<T>>>,
    {
        let mut result = PartialFetch {
            items: Vec::new(),
            pages_fetched: 0,
            truncated: false,
            error: None,
        };
        let mut page: u32 = 1;

        loop {
            if result.pages_fetched >= self.max_pages {
                warn!(
                    resource,
                    max_pages = self.max_pages,
                    items = result.items.len(),
                    "Reached pagination safety bound, stopping fetch"
                );
                result.truncated = true;
                break;
            }
            if result.pages_fetched > 0 && !self.inter_page_delay.is_zero() {
                tokio::time::sleep(self.inter_page_delay).await;
            }

            match fetch(page, self.page_size).await {
                Ok(batch) => {
                    result.pages_fetched += 1;
                    let is_last = batch.is_last();
                    debug!(
                        resource,
                        page,
                        total_pages = batch.total_pages,
                        count = batch.items.len(),
                        "Fetched page"
                    );
                    result.items.extend(batch.items);
                    if is_last {
                        break;
                    }
                    page = page.saturating_add(1);
                }
                Err(error) => {
                    warn!(
                        resource,
                        page,
                        collected = result.items.len(),
                        error = %error,
                        "Page fetch failed, stopping pagination"
                    );
                    result.error = Some(error);
                    break;
                }
            }
        }

        result
    }
}

/// Outcome of a fetch that may have stopped early.
///
/// A fetch carrying an error is authoritative only for the items it holds,
/// never evidence that the collection is empty.
#[derive(Debug)]
pub struct PartialFetch<T> {
    pub items: Vec<T>,
    pub pages_fetched: u32,
    /// The safety bound stopped the fetch before the source reported its last page.
    pub truncated: bool,
    pub error: Option<ClientError>,
}

impl<T> PartialFetch<T> {
    /// Fetched every page without error.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && !self.truncated
    }

    /// Discard partial results when a page failed.
    pub fn into_result(self) -> ClientResult<Vec<T>> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.items),
        }
    }
}
