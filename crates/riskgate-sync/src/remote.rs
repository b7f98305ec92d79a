//! Fresh reads of remote list membership.

use riskgate_core::{ListStore, RemoteListState};

use crate::error::{SyncError, SyncResult};
use crate::paginate::Paginator;

/// Fetch a list's full membership. Never cached.
///
/// A fetch that failed part-way or hit the page bound is an error: the caller
/// would otherwise diff against an incomplete view and mistake unseen items
/// for missing ones.
pub async fn fetch_remote_state(
    list_store: &dyn ListStore,
    list_id: &str,
    paginator: &Paginator,
) -> SyncResult<RemoteListState> {
    let fetch = paginator
        .fetch_all_partial(list_id, |page, page_size| {
            list_store.fetch_list_page(list_id, page, page_size)
        })
        .await;

    if fetch.is_complete() {
        return Ok(RemoteListState::new(list_id, fetch.items));
    }

    match fetch.error {
        Some(error) if fetch.pages_fetched == 0 => Err(SyncError::Client(error)),
        Some(error) => Err(SyncError::IncompleteFetch {
            resource: format!("list {list_id}"),
            reason: format!(
                "stopped after {} page(s) with {} item(s): {error}",
                fetch.pages_fetched,
                fetch.items.len()
            ),
        }),
        None => Err(SyncError::IncompleteFetch {
            resource: format!("list {list_id}"),
            reason: format!(
                "page limit of {} reached with {} item(s)",
                paginator.max_pages,
                fetch.items.len()
            ),
        }),
    }
}
