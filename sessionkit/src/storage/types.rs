use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::StorageError;

/// Durable form of a session, as written to a [`SessionStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub values: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Token -> session state mapping with expiry.
///
/// Implementations must give read-your-writes consistency for a single token
/// within one process and atomic per-key writes. They need not lock across
/// requests: concurrent commits for the same token are last-write-wins.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Returns `Ok(None)` for unknown or expired tokens.
    async fn load(&self, token: &str) -> Result<Option<SessionRecord>, StorageError>;

    /// Insert or replace the record stored under `token` until `expiry`.
    async fn save(
        &self,
        token: &str,
        record: &SessionRecord,
        expiry: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Removing an unknown token is not an error.
    async fn delete(&self, token: &str) -> Result<(), StorageError>;
}
