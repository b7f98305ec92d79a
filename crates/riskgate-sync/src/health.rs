//! Reachability probe for the two remote collaborators.

use std::future::Future;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use riskgate_core::{ClientResult, ListStore, RiskSource};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Upper bound on a single reachability check.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of one reachability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub healthy: bool,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Combined health of the risk source and the list store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// True only when every check passed.
    pub healthy: bool,
    pub checked_at: DateTime<Utc>,
    pub checks: Vec<HealthCheck>,
}

/// Ping both collaborators concurrently.
pub async fn probe(
    risk_source: &dyn RiskSource,
    list_store: &dyn ListStore,
    list_id: &str,
    timeout: Duration,
) -> HealthReport {
    let (risk, lists) = tokio::join!(
        timed("risk_source", timeout, risk_source.ping()),
        timed("list_store", timeout, list_store.ping(list_id)),
    );

    let checks = vec![risk, lists];
    HealthReport {
        healthy: checks.iter().all(|c| c.healthy),
        checked_at: Utc::now(),
        checks,
    }
}

async fn timed<F>(name: &str, timeout: Duration, check: F) -> HealthCheck
where
    F: Future<Output = ClientResult<()>>,
{
    let start = Instant::now();
    let result = tokio::time::timeout(timeout, check).await;
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    let error = match result {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(_) => Some(format!("timed out after {}ms", timeout.as_millis())),
    };
    if let Some(error) = &error {
        warn!(check = name, latency_ms, error = %error, "Health check failed");
    }

    HealthCheck {
        name: name.to_string(),
        healthy: error.is_none(),
        latency_ms,
        error,
    }
}

#[cfg(test)]
mod tests {
    use riskgate_core::ClientError;

    use super::*;

    #[tokio::test]
    async fn test_timed_success() {
        let check = timed("ok", Duration::from_secs(1), async { Ok(()) }).await;
        assert!(check.healthy);
        assert!(check.error.is_none());
    }

    #[tokio::test]
    async fn test_timed_failure_carries_error() {
        let check = timed("down", Duration::from_secs(1), async {
            Err(ClientError::Network("connection refused".into()))
        })
        .await;
        assert!(!check.healthy);
        assert_eq!(
            check.error.as_deref(),
            Some("network error: connection refused")
        );
    }

    #[tokio::test]
    async fn test_timed_out_check_is_unhealthy() {
        let check = timed("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await;
        assert!(!check.healthy);
        assert!(check.error.unwrap().starts_with("timed out"));
    }
}
