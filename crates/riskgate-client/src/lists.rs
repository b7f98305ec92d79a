//! Remote list store client.
//!
//! Lists are named sets of string values. Membership is changed either by an
//! incremental `PATCH` carrying `append`/`remove`, or by a full `PUT`.

use async_trait::async_trait;
use riskgate_core::{
    ClientError, ClientResult, ListPage, ListPatch, ListReplacement, ListStore, RemoteListItem,
};
use tracing::{debug, info};

use crate::envelope::read_envelope;
use crate::retry::{RetryPolicy, RetryingTransport};
use crate::{normalize_base_url, HttpClientConfig};

/// HTTP client for `{base}/lists/{id}`.
#[derive(Debug, Clone)]
pub struct ListApiClient {
    base_url: String,
    token: String,
    transport: RetryingTransport,
}

impl ListApiClient {
    /// Create a client from connection settings.
    pub fn new(config: &HttpClientConfig) -> ClientResult<Self> {
        let http = config.build_http_client()?;
        Ok(Self {
            base_url: normalize_base_url(&config.base_url)?,
            token: config.token.clone(),
            transport: RetryingTransport::new(http, config.retry.clone()),
        })
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    pub fn with_http_client(
        base_url: &str,
        token: impl Into<String>,
        http: reqwest::Client,
        retry: RetryPolicy,
    ) -> ClientResult<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            token: token.into(),
            transport: RetryingTransport::new(http, retry),
        })
    }

    fn list_url(&self, list_id: &str) -> ClientResult<String> {
        if list_id.trim().is_empty() || list_id.contains('/') {
            return Err(ClientError::InvalidConfig(format!(
                "invalid list id: {list_id:?}"
            )));
        }
        Ok(format!("{}/lists/{}", self.base_url, list_id))
    }
}

#[async_trait]
impl ListStore for ListApiClient {
    async fn fetch_list_page(
        &self,
        list_id: &str,
        page: u32,
        page_size: u32,
    ) -> ClientResult<ListPage> {
        let url = format!("{}/items", self.list_url(list_id)?);
        debug!(list_id, page, page_size, "GET {}", url);

        let response = self
            .transport
            .send("fetch_list_page", |http| {
                http.get(&url)
                    .bearer_auth(&self.token)
                    .query(&[("page", page), ("per_page", page_size)])
            })
            .await?;
        let envelope = read_envelope::<Vec<RemoteListItem>>(response).await?;

        let (current_page, total_pages) = envelope
            .result_info
            .as_ref()
            .map_or((page, page), |info| info.resolve_pages(page));

        Ok(ListPage {
            items: envelope.result.unwrap_or_default(),
            current_page,
            total_pages,
        })
    }

    async fn apply_incremental(&self, list_id: &str, patch: &ListPatch) -> ClientResult<()> {
        let url = self.list_url(list_id)?;
        info!(
            list_id,
            append = patch.append.len(),
            remove = patch.remove.len(),
            "PATCH {}",
            url
        );

        let response = self
            .transport
            .send("apply_incremental", |http| {
                http.patch(&url).bearer_auth(&self.token).json(patch)
            })
            .await?;
        read_envelope::<serde_json::Value>(response).await.map(|_| ())
    }

    async fn replace_all(&self, list_id: &str, replacement: &ListReplacement) -> ClientResult<()> {
        let url = self.list_url(list_id)?;
        info!(list_id, items = replacement.items.len(), "PUT {}", url);

        let response = self
            .transport
            .send("replace_all", |http| {
                http.put(&url).bearer_auth(&self.token).json(replacement)
            })
            .await?;
        read_envelope::<serde_json::Value>(response).await.map(|_| ())
    }

    async fn ping(&self, list_id: &str) -> ClientResult<()> {
        let url = self.list_url(list_id)?;
        let response = self
            .transport
            .send("ping_list", |http| http.get(&url).bearer_auth(&self.token))
            .await?;
        read_envelope::<serde_json::Value>(response).await.map(|_| ())
    }
}
