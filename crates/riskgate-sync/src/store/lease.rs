//! Per-tier mutual exclusion across reconciliation passes.

use std::sync::Arc;
use std::time::Duration;

use riskgate_core::{RiskTier, SnapshotStore, StoreResult};
use tracing::{debug, warn};
use uuid::Uuid;

fn lease_key(tier: RiskTier) -> String {
    format!("lease:{tier}")
}

/// Exclusive claim on one tier, held for at most its TTL.
#[derive(Debug)]
pub struct TierLease {
    tier: RiskTier,
    token: String,
}

impl TierLease {
    /// Try to claim `tier`. Returns `None` when another holder has a live lease.
    pub async fn acquire(
        store: &Arc<dyn SnapshotStore>,
        tier: RiskTier,
        ttl: Duration,
    ) -> StoreResult<Option<Self>> {
        let token = Uuid::new_v4().to_string();
        if store
            .put_if_absent(&lease_key(tier), token.clone(), Some(ttl))
            .await?
        {
            debug!(tier = %tier, ttl_secs = ttl.as_secs(), "Acquired tier lease");
            Ok(Some(Self { tier, token }))
        } else {
            Ok(None)
        }
    }

    #[must_use]
    pub fn tier(&self) -> RiskTier {
        self.tier
    }

    /// Release the lease if we still hold it.
    ///
    /// A lease that expired and was claimed by someone else is left alone.
    pub async fn release(self, store: &Arc<dyn SnapshotStore>) -> StoreResult<()> {
        let key = lease_key(self.tier);
        match store.get(&key).await? {
            Some(current) if current == self.token => {
                store.delete(&key).await?;
                debug!(tier = %self.tier, "Released tier lease");
            }
            Some(_) => {
                warn!(tier = %self.tier, "Tier lease taken over by another holder, not releasing");
            }
            None => {
                warn!(tier = %self.tier, "Tier lease expired before release");
            }
        }
        Ok(())
    }
}
