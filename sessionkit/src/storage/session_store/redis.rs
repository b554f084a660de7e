use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{self, AsyncCommands};

use crate::storage::errors::StorageError;
use crate::storage::types::{SessionRecord, SessionStore};

const KEY_PREFIX: &str = "session";

/// Session store backed by Redis; expiry is delegated to the key TTL.
#[derive(Clone, Debug)]
pub struct RedisSessionStore {
    client: redis::Client,
}

impl RedisSessionStore {
    /// Open a client for `url` and verify the server is reachable.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(url)?;
        let store = Self { client };
        let _conn = store.client.get_multiplexed_async_connection().await?;
        tracing::info!("Connected to redis session store");
        Ok(store)
    }

    fn make_key(token: &str) -> String {
        format!("{KEY_PREFIX}:{token}")
    }

    /// Whole seconds until `expiry`, or `None` if it has already passed.
    fn ttl_secs(expiry: DateTime<Utc>, now: DateTime<Utc>) -> Option<u64> {
        let millis = (expiry - now).num_milliseconds();
        if millis <= 0 {
            return None;
        }
        // Round up so a key never outlives its session by less than a second
        Some(((millis + 999) / 1000) as u64)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, token: &str) -> Result<Option<SessionRecord>, StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(Self::make_key(token)).await?;

        let Some(value) = value else {
            return Ok(None);
        };

        let record: SessionRecord = serde_json::from_str(&value)?;
        if record.is_expired_at(Utc::now()) {
            return Ok(None);
        }
        Ok(Some(record))
    }

    async fn save(
        &self,
        token: &str,
        record: &SessionRecord,
        expiry: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let key = Self::make_key(token);
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let Some(ttl) = Self::ttl_secs(expiry, Utc::now()) else {
            let _: () = conn.del(&key).await?;
            return Ok(());
        };

        let value = serde_json::to_string(record)?;
        let _: () = conn.set_ex(&key, value, ttl).await?;
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<(), StorageError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(Self::make_key(token)).await?;
        Ok(())
    }
}
