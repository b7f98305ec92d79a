//! HTTP collaborators for riskgate.
//!
//! Every outbound call goes through [`retry::RetryingTransport`], which
//! retries rate limits, server errors and network failures with exponential
//! backoff and fails fast on client errors.

pub mod envelope;
pub mod lists;
pub mod retry;
pub mod risk;

pub use lists::ListApiClient;
pub use retry::{RetryPolicy, RetryingTransport};
pub use risk::RiskApiClient;

use std::time::Duration;

use riskgate_core::{ClientError, ClientResult};

/// Connection settings shared by both API clients.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL, e.g. `https://api.example.com/v1`. Trailing slashes are ignored.
    pub base_url: String,
    /// Bearer token sent on every request.
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry behavior for transient failures.
    pub retry: RetryPolicy,
}

impl HttpClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build the underlying `reqwest::Client`.
    pub(crate) fn build_http_client(&self) -> ClientResult<reqwest::Client> {
        if self.token.trim().is_empty() {
            return Err(ClientError::InvalidConfig("API token is empty".to_string()));
        }
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("riskgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::InvalidConfig(format!("Failed to build HTTP client: {e}")))
    }
}

/// Normalize a base URL: strip trailing slashes and reject empty values.
pub(crate) fn normalize_base_url(base_url: &str) -> ClientResult<String> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ClientError::InvalidConfig("base URL is empty".to_string()));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ClientError::InvalidConfig(format!(
            "base URL must start with http:// or https://: {trimmed}"
        )));
    }
    Ok(trimmed.to_string())
}
