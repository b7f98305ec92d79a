//! Retrying transport with exponential backoff.
//!
//! Retries HTTP 429 (honoring `Retry-After`), HTTP 5xx and network failures
//! up to a fixed number of attempts. Any other status is returned as-is on
//! the first attempt. No jitter is applied.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use riskgate_core::{ClientError, ClientResult};
use tracing::{debug, warn};

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Base delay for exponential backoff (`base * 2^attempt`).
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given attempt count and base delay.
    /// The delay cap defaults to 60 seconds.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay: Duration::from_secs(60),
        }
    }

    /// Effective attempt count; a zero setting still sends the request once.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Exponential backoff for a 0-based attempt number, capped at `max_delay`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Delay before retrying a 429: `Retry-After` when present, else backoff.
    #[must_use]
    pub fn rate_limit_delay(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        match retry_after_secs {
            Some(secs) => Duration::from_secs(secs).min(self.max_delay),
            None => self.backoff(attempt),
        }
    }
}

/// Parse a numeric `Retry-After` header.
#[must_use]
pub fn retry_after_secs(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// HTTP client wrapper that applies a [`RetryPolicy`] to every request.
#[derive(Debug, Clone)]
pub struct RetryingTransport {
    http: reqwest::Client,
    policy: RetryPolicy,
}

impl RetryingTransport {
    #[must_use]
    pub fn new(http: reqwest::Client, policy: RetryPolicy) -> Self {
        Self { http, policy }
    }

    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send a request built by `build`, retrying transient failures.
    ///
    /// `build` is called once per attempt since a `RequestBuilder` is consumed
    /// by sending. Returns the raw response for any status that is not retried,
    /// and the last response once attempts are exhausted on 429/5xx. Network
    /// failures on the final attempt surface as [`ClientError::Network`].
    pub async fn send<F>(&self, operation: &str, build: F) -> ClientResult<Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let attempts = self.policy.attempts();
        let mut attempt: u32 = 0;

        loop {
            let is_last = attempt + 1 >= attempts;

            let delay = match build(&self.http).send().await {
                Ok(response) => {
                    let status = response.status();
                    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS;
                    if !(rate_limited || status.is_server_error()) {
                        if attempt > 0 {
                            debug!(
                                operation,
                                attempt = attempt + 1,
                                status = status.as_u16(),
                                "Request completed after retries"
                            );
                        }
                        return Ok(response);
                    }
                    if is_last {
                        warn!(
                            operation,
                            attempts = attempt + 1,
                            status = status.as_u16(),
                            "Retry attempts exhausted"
                        );
                        return Ok(response);
                    }
                    if rate_limited {
                        self.policy
                            .rate_limit_delay(attempt, retry_after_secs(&response))
                    } else {
                        self.policy.backoff(attempt)
                    }
                }
                Err(error) if error.is_builder() => {
                    return Err(ClientError::InvalidConfig(error.to_string()));
                }
                Err(error) => {
                    if is_last {
                        warn!(
                            operation,
                            attempts = attempt + 1,
                            error = %error,
                            "Network failure, retry attempts exhausted"
                        );
                        return Err(ClientError::Network(error.to_string()));
                    }
                    self.policy.backoff(attempt)
                }
            };

            debug!(
                operation,
                attempt = attempt + 1,
                max_attempts = attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Retrying after transient failure"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
