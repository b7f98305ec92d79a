//! API error type.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use riskgate_sync::SyncError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error returned by the trigger endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Path did not name a tier.
    #[error("unknown risk tier: {0}")]
    InvalidTier(String),

    /// Nothing recorded yet.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Engine error.
    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::InvalidTier(_) => (StatusCode::BAD_REQUEST, "invalid_tier", self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            ApiError::Sync(SyncError::LeaseHeld(_)) => {
                (StatusCode::CONFLICT, "tier_locked", self.to_string())
            }
            ApiError::Sync(SyncError::MissingExpectedState(_)) => (
                StatusCode::NOT_FOUND,
                "expected_state_not_found",
                self.to_string(),
            ),
            ApiError::Sync(SyncError::Client(_) | SyncError::IncompleteFetch { .. }) => {
                (StatusCode::BAD_GATEWAY, "upstream_error", self.to_string())
            }
            ApiError::Sync(SyncError::Store(e)) => {
                error!(error = %e, "Snapshot store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store_error",
                    "Internal snapshot store error".to_string(),
                )
            }
            ApiError::Sync(SyncError::Core(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                self.to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_type,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
