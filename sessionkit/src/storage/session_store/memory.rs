use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::storage::errors::StorageError;
use crate::storage::types::{SessionRecord, SessionStore};

struct Entry {
    record: SessionRecord,
    expiry: DateTime<Utc>,
}

/// Process-local session store. Suitable for tests and single-instance deployments.
#[derive(Default)]
pub struct InMemorySessionStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory session store");
        Self::default()
    }

    /// Number of entries currently held, expired ones included until swept or loaded.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Drop every entry whose expiry has passed. Returns the number removed.
    pub async fn delete_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expiry > now);
        before - entries.len()
    }

    /// Periodically sweep expired entries in the background.
    pub fn spawn_cleanup(self: Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match self.delete_expired().await {
                    0 => {}
                    n => tracing::debug!("Removed {} expired sessions", n),
                }
            }
        })
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, token: &str) -> Result<Option<SessionRecord>, StorageError> {
        let mut entries = self.entries.lock().await;

        let expired = match entries.get(token) {
            None => return Ok(None),
            Some(entry) => entry.expiry <= Utc::now(),
        };

        if expired {
            tracing::debug!("Evicting expired session entry");
            entries.remove(token);
            return Ok(None);
        }

        Ok(entries.get(token).map(|entry| entry.record.clone()))
    }

    async fn save(
        &self,
        token: &str,
        record: &SessionRecord,
        expiry: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.entries.lock().await.insert(
            token.to_string(),
            Entry {
                record: record.clone(),
                expiry,
            },
        );
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<(), StorageError> {
        self.entries.lock().await.remove(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::BTreeMap;

    fn record_with(key: &str, value: &str, ttl: Duration) -> SessionRecord {
        let now = Utc::now();
        let mut values = BTreeMap::new();
        values.insert(key.to_string(), serde_json::json!(value));
        SessionRecord {
            values,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    #[tokio::test]
    async fn test_save_and_load() {
        // Given an in-memory store with a saved record
        let store = InMemorySessionStore::new();
        let record = record_with("flash", "saved", Duration::hours(1));
        store
            .save("token1", &record, record.expires_at)
            .await
            .unwrap();

        // When loading the same token
        let loaded = store.load("token1").await.unwrap();

        // Then the record should be returned
        assert_eq!(loaded, Some(record));
    }

    #[tokio::test]
    async fn test_load_unknown_token_is_none() {
        let store = InMemorySessionStore::new();
        assert!(store.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_expired_token_is_none_and_evicted() {
        // Given a record whose expiry is already in the past
        let store = InMemorySessionStore::new();
        let record = record_with("k", "v", Duration::hours(1));
        store
            .save("old", &record, Utc::now() - Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(store.len().await, 1);

        // When loading it
        let loaded = store.load("old").await.unwrap();

        // Then it is treated as unknown and dropped
        assert!(loaded.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = InMemorySessionStore::new();
        let first = record_with("k", "first", Duration::hours(1));
        let second = record_with("k", "second", Duration::hours(1));

        store.save("t", &first, first.expires_at).await.unwrap();
        store.save("t", &second, second.expires_at).await.unwrap();

        assert_eq!(store.load("t").await.unwrap(), Some(second));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemorySessionStore::new();
        let record = record_with("k", "v", Duration::hours(1));
        store.save("t", &record, record.expires_at).await.unwrap();

        store.delete("t").await.unwrap();
        assert!(store.load("t").await.unwrap().is_none());

        // Deleting again is fine
        assert!(store.delete("t").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_expired_removes_abandoned_entries() {
        // Given many expired entries that are never loaded again, and one live one
        let store = InMemorySessionStore::new();
        let record = record_with("k", "v", Duration::hours(1));
        let past = Utc::now() - Duration::seconds(1);
        for i in 0..50 {
            store.save(&format!("gone{i}"), &record, past).await.unwrap();
        }
        store.save("live", &record, record.expires_at).await.unwrap();

        // When sweeping
        let removed = store.delete_expired().await;

        // Then only the live entry remains
        assert_eq!(removed, 50);
        assert_eq!(store.len().await, 1);
        assert!(store.load("live").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_spawn_cleanup_sweeps_in_background() {
        // Given a store with a short-lived entry and a running sweeper
        let store = Arc::new(InMemorySessionStore::new());
        let record = record_with("k", "v", Duration::hours(1));
        store
            .save("short", &record, Utc::now() + Duration::milliseconds(30))
            .await
            .unwrap();
        let sweeper = store.clone().spawn_cleanup(std::time::Duration::from_millis(10));

        // When the entry expires without ever being loaded
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;

        // Then the sweeper has dropped it
        assert!(store.is_empty().await);
        sweeper.abort();
    }
}
