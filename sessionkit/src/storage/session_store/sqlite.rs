use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::task::JoinHandle;

use crate::storage::errors::StorageError;
use crate::storage::types::{SessionRecord, SessionStore};

const DEFAULT_TABLE: &str = "sessions";

/// Relational session store: one row per token holding the JSON-encoded
/// record and its absolute expiry (unix milliseconds).
#[derive(Clone, Debug)]
pub struct SqliteSessionStore {
    pool: SqlitePool,
    table: String,
}

impl SqliteSessionStore {
    /// Connect to `url` (e.g. `sqlite://sessions.db` or `sqlite::memory:`) and create the table.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let opts = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // Every connection to an in-memory database sees its own database,
        // and the database disappears with its last connection.
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(opts).await?;

        let store = Self::from_pool(pool, DEFAULT_TABLE);
        store.init().await?;

        tracing::info!("Connected to sqlite session store: url={}", url);
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool, table: &str) -> Self {
        Self {
            pool,
            table: table.to_string(),
        }
    }

    pub async fn init(&self) -> Result<(), StorageError> {
        let table = self.table.as_str();

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                token TEXT PRIMARY KEY NOT NULL,
                data TEXT NOT NULL,
                expiry INTEGER NOT NULL
            )
            "#
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_expiry ON {table}(expiry)"
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove every row whose expiry has passed. Returns the number of rows removed.
    pub async fn delete_expired(&self) -> Result<u64, StorageError> {
        let table = self.table.as_str();
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE expiry <= ?"))
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Periodically sweep expired rows in the background.
    pub fn spawn_cleanup(self: Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match self.delete_expired().await {
                    Ok(0) => {}
                    Ok(n) => tracing::debug!("Removed {} expired sessions", n),
                    Err(e) => tracing::error!("Failed to remove expired sessions: {}", e),
                }
            }
        })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, token: &str) -> Result<Option<SessionRecord>, StorageError> {
        let table = self.table.as_str();

        let row: Option<(String, i64)> =
            sqlx::query_as(&format!("SELECT data, expiry FROM {table} WHERE token = ?"))
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((data, expiry)) if expiry > Utc::now().timestamp_millis() => {
                Ok(Some(serde_json::from_str(&data)?))
            }
            _ => Ok(None),
        }
    }

    async fn save(
        &self,
        token: &str,
        record: &SessionRecord,
        expiry: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let table = self.table.as_str();
        let data = serde_json::to_string(record)?;

        sqlx::query(&format!(
            r#"
            INSERT INTO {table} (token, data, expiry) VALUES (?, ?, ?)
            ON CONFLICT(token) DO UPDATE SET data = excluded.data, expiry = excluded.expiry
            "#
        ))
        .bind(token)
        .bind(data)
        .bind(expiry.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<(), StorageError> {
        let table = self.table.as_str();
        sqlx::query(&format!("DELETE FROM {table} WHERE token = ?"))
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::BTreeMap;

    async fn memory_store() -> SqliteSessionStore {
        SqliteSessionStore::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite")
    }

    fn record(flash: &str) -> SessionRecord {
        let now = Utc::now();
        let mut values = BTreeMap::new();
        values.insert("flash".to_string(), serde_json::json!(flash));
        SessionRecord {
            values,
            created_at: now,
            expires_at: now + Duration::hours(12),
        }
    }

    #[tokio::test]
    async fn test_save_load_delete() {
        // Given a sqlite store with one saved session
        let store = memory_store().await;
        let rec = record("saved");
        store.save("tok", &rec, rec.expires_at).await.unwrap();

        // Then loading returns it
        let loaded = store.load("tok").await.unwrap().expect("row present");
        assert_eq!(loaded.values, rec.values);

        // And after deleting, it is gone
        store.delete("tok").await.unwrap();
        assert!(store.load("tok").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_is_upsert() {
        let store = memory_store().await;
        let first = record("first");
        let second = record("second");

        store.save("tok", &first, first.expires_at).await.unwrap();
        store.save("tok", &second, second.expires_at).await.unwrap();

        let loaded = store.load("tok").await.unwrap().unwrap();
        assert_eq!(loaded.values["flash"], serde_json::json!("second"));
    }

    #[tokio::test]
    async fn test_expired_row_is_not_found() {
        let store = memory_store().await;
        let rec = record("stale");
        store
            .save("tok", &rec, Utc::now() - Duration::seconds(1))
            .await
            .unwrap();

        assert!(store.load("tok").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_expired_only_removes_expired_rows() {
        // Given one live and one expired row
        let store = memory_store().await;
        let rec = record("x");
        store.save("live", &rec, rec.expires_at).await.unwrap();
        store
            .save("dead", &rec, Utc::now() - Duration::minutes(1))
            .await
            .unwrap();

        // When sweeping
        let removed = store.delete_expired().await.unwrap();

        // Then only the expired row is removed
        assert_eq!(removed, 1);
        assert!(store.load("live").await.unwrap().is_some());
    }
}
