//! Response envelope shared by the risk and list APIs, and status mapping.
//!
//! ```json
//! { "success": true, "errors": [], "result": [...],
//!   "result_info": { "page": 1, "per_page": 100, "total_pages": 3, "total_count": 250 } }
//! ```

use reqwest::{Response, StatusCode};
use riskgate_core::{ClientError, ClientResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use crate::retry::retry_after_secs;

/// An error or message entry in the envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

/// Pagination metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultInfo {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total_count: Option<u64>,
}

impl ResultInfo {
    /// Current and total page for a response to a request for `requested`.
    ///
    /// A missing `page` falls back to `requested`. Total pages are derived
    /// from `total_count` when the source omits them; without either, the
    /// current page is treated as the last one.
    #[must_use]
    pub fn resolve_pages(&self, requested: u32) -> (u32, u32) {
        let current = self.page.unwrap_or(requested);
        if let Some(total) = self.total_pages {
            return (current, total);
        }
        let total = match (self.total_count, self.per_page) {
            (Some(count), per_page) if per_page > 0 => {
                u32::try_from(count.div_ceil(u64::from(per_page))).unwrap_or(u32::MAX)
            }
            _ => current,
        };
        (current, total)
    }
}

/// Standard response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    pub result: Option<T>,
    #[serde(default)]
    pub result_info: Option<ResultInfo>,
}

impl<T> Envelope<T> {
    fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return "remote reported failure without details".to_string();
        }
        self.errors
            .iter()
            .map(|e| match e.code {
                Some(code) => format!("{code}: {}", e.message),
                None => e.message.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Turn a raw response into a successful envelope or a classified error.
pub async fn read_envelope<T: DeserializeOwned>(response: Response) -> ClientResult<Envelope<T>> {
    let status = response.status();
    if !status.is_success() {
        return Err(error_for_status(response).await);
    }

    let body = response
        .text()
        .await
        .map_err(|e| ClientError::Network(format!("failed to read response body: {e}")))?;
    let envelope: Envelope<T> = serde_json::from_str(&body)
        .map_err(|e| ClientError::Parse(format!("Failed to parse response: {e}")))?;

    if !envelope.success {
        return Err(ClientError::Rejected(envelope.error_summary()));
    }
    Ok(envelope)
}

/// Map a non-success response to a [`ClientError`].
pub async fn error_for_status(response: Response) -> ClientError {
    let status = response.status();
    let retry_after = retry_after_secs(&response);
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    let detail = if body.is_empty() {
        format!("HTTP {status}")
    } else {
        body
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            warn!(retry_after_secs = ?retry_after, "Remote API still rate limiting");
            ClientError::RateLimited {
                retry_after_secs: retry_after,
            }
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Auth {
            status: status.as_u16(),
            detail,
        },
        s if s.is_server_error() => ClientError::Server {
            status: s.as_u16(),
            detail,
        },
        s => ClientError::Http {
            status: s.as_u16(),
            detail,
        },
    }
}
