use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::UserError;

/// A user record as seen by the authentication gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Login identifier
    pub email: String,
    /// Deactivated users never count as authenticated
    pub active: bool,
    /// When the user account was created
    pub created_at: DateTime<Utc>,
}

/// Lookup of user records by id.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// `Ok(None)` when no user has this id.
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, UserError>;
}
