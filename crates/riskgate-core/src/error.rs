//! Error types shared by the engine and its collaborators.
//!
//! Collaborator errors carry a transient/permanent classification so the
//! retrying transport and the engine can decide what to retry and what to
//! surface.

use thiserror::Error;

use crate::state::SyncState;
use crate::tier::RiskTier;

/// Errors raised by domain logic.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A risk level string did not name one of the three tiers.
    #[error("invalid risk tier: {0}")]
    InvalidTier(String),

    /// A sync state transition that the state machine does not allow.
    #[error("invalid sync state transition for {tier}: {from} -> {to}")]
    InvalidTransition {
        tier: RiskTier,
        from: &'static str,
        to: &'static str,
    },

    /// Snapshot (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn transition(tier: RiskTier, from: &SyncState, to: &'static str) -> Self {
        Self::InvalidTransition {
            tier,
            from: from.label(),
            to,
        }
    }
}

/// Errors returned by the risk source and the remote list store.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network-level failure (connect, timeout, reset).
    #[error("network error: {0}")]
    Network(String),

    /// Rate limited by the remote side after all attempts.
    #[error("rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Remote returned a 5xx status after all attempts.
    #[error("server error {status}: {detail}")]
    Server { status: u16, detail: String },

    /// Credentials were refused (401/403).
    #[error("authentication failed ({status}): {detail}")]
    Auth { status: u16, detail: String },

    /// Any other non-success HTTP status.
    #[error("http error {status}: {detail}")]
    Http { status: u16, detail: String },

    /// Remote accepted the request but reported failure in its envelope.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Response body could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Client configuration is invalid (bad URL, missing token, ...).
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    /// Whether the failure is transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited { .. })
    }

    /// Whether the remote side failed with a 5xx status.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Server { .. })
    }
}

/// Result alias for collaborator calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised by snapshot store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store failed.
    #[error("snapshot backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A stored value could not be (de)serialized.
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Wrap a backend failure.
    pub fn backend<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result alias for snapshot store calls.
pub type StoreResult<T> = Result<T, StoreError>;
