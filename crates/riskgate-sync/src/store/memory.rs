//! In-memory snapshot store.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use riskgate_core::{SnapshotStore, StoreResult};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Process-local snapshot store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys of all live entries, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

fn expiry(ttl: Option<Duration>) -> Option<Instant> {
    ttl.and_then(|ttl| Instant::now().checked_add(ttl))
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> StoreResult<()> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                key.to_string(),
                Entry {
                    value,
                    expires_at: expiry(ttl),
                },
            );
        Ok(())
    }

    async fn put_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> StoreResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.get(key).is_some_and(|entry| entry.is_live(now)) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: expiry(ttl),
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}
