//! PostgreSQL snapshot store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use riskgate_core::{SnapshotStore, StoreError, StoreResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Snapshot store backed by a single key-value table.
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the snapshot table exists.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(|e| StoreError::backend("failed to connect to database", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Create the snapshot table if it is missing.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS riskgate_snapshots (
                key         TEXT PRIMARY KEY,
                value       TEXT NOT NULL,
                expires_at  TIMESTAMPTZ,
                updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::backend("failed to create snapshot table", e))?;
        info!("Snapshot table ready");
        Ok(())
    }
}

fn expires_at(ttl: Option<Duration>) -> Option<DateTime<Utc>> {
    ttl.and_then(|ttl| chrono::Duration::from_std(ttl).ok())
        .map(|ttl| Utc::now() + ttl)
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        sqlx::query_scalar::<_, String>(
            r"
            SELECT value FROM riskgate_snapshots
            WHERE key = $1 AND (expires_at IS NULL OR expires_at > now())
            ",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::backend(format!("failed to read {key}"), e))
    }

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> StoreResult<()> {
        sqlx::query(
            r"
            INSERT INTO riskgate_snapshots (key, value, expires_at, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at, updated_at = now()
            ",
        )
        .bind(key)
        .bind(value)
        .bind(expires_at(ttl))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::backend(format!("failed to write {key}"), e))?;
        Ok(())
    }

    async fn put_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO riskgate_snapshots (key, value, expires_at, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at, updated_at = now()
            WHERE riskgate_snapshots.expires_at IS NOT NULL
              AND riskgate_snapshots.expires_at <= now()
            ",
        )
        .bind(key)
        .bind(value)
        .bind(expires_at(ttl))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::backend(format!("failed to claim {key}"), e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM riskgate_snapshots WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::backend(format!("failed to delete {key}"), e))?;
        Ok(())
    }
}
