//! Risk-score source client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use riskgate_core::{ClientResult, RiskPage, RiskRecord, RiskSource, RiskTier};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::envelope::read_envelope;
use crate::retry::{RetryPolicy, RetryingTransport};
use crate::{normalize_base_url, HttpClientConfig};

/// A risk score entry as returned by the source.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskScoreItem {
    pub email: String,
    pub risk_level: String,
    #[serde(default)]
    pub event_count: u64,
    #[serde(default)]
    pub last_event: Option<DateTime<Utc>>,
}

impl RiskScoreItem {
    /// Convert to a domain record. Entries with an empty handle or an unknown
    /// risk level are dropped with a warning.
    fn into_record(self) -> Option<RiskRecord> {
        let identifier = self.email.trim().to_string();
        if identifier.is_empty() {
            warn!("Skipping risk score without a user identifier");
            return None;
        }
        match self.risk_level.parse::<RiskTier>() {
            Ok(tier) => Some(RiskRecord {
                identifier,
                tier,
                event_count: self.event_count,
                last_event: self.last_event,
            }),
            Err(e) => {
                warn!(identifier = %identifier, error = %e, "Skipping risk score with unknown level");
                None
            }
        }
    }
}

/// HTTP client for `GET {base}/risk-scores`.
#[derive(Debug, Clone)]
pub struct RiskApiClient {
    base_url: String,
    token: String,
    transport: RetryingTransport,
}

impl RiskApiClient {
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

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RiskSource for RiskApiClient {
    async fn fetch_risk_page(&self, page: u32, page_size: u32) -> ClientResult<RiskPage> {
        let url = format!("{}/risk-scores", self.base_url);
        debug!(page, page_size, "GET {}", url);

        let response = self
            .transport
            .send("fetch_risk_page", |http| {
                http.get(&url)
                    .bearer_auth(&self.token)
                    .query(&[("page", page), ("per_page", page_size)])
            })
            .await?;
        let envelope = read_envelope::<Vec<RiskScoreItem>>(response).await?;

        let (current_page, total_pages) = envelope
            .result_info
            .as_ref()
            .map_or((page, page), |info| info.resolve_pages(page));
        let items = envelope
            .result
            .unwrap_or_default()
            .into_iter()
            .filter_map(RiskScoreItem::into_record)
            .collect();

        Ok(RiskPage {
            items,
            current_page,
            total_pages,
        })
    }

    async fn ping(&self) -> ClientResult<()> {
        self.fetch_risk_page(1, 1).await.map(|_| ())
    }
}
