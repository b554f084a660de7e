use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::session::config::{AUTH_USER_ID_KEY, CSRF_TOKEN_KEY};
use crate::session::errors::SessionError;
use crate::storage::SessionRecord;

/// Whether the in-memory session diverges from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Matches what the store holds; commit writes nothing
    Unmodified,
    /// Dirty; the next commit persists it and refreshes the cookie
    Modified,
    /// Store entry deleted; the next commit clears the cookie
    Destroyed,
}

/// Server-side session bound to a client by an opaque cookie token.
///
/// Value accessors only touch memory. Nothing reaches the store until
/// [`crate::SessionManager::commit`].
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) token: String,
    pub(crate) values: BTreeMap<String, serde_json::Value>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_activity: DateTime<Utc>,
    pub(crate) expires_at: DateTime<Utc>,
    pub(crate) status: SessionStatus,
    pub(crate) is_new: bool,
    pub(crate) rotated: bool,
}

impl Session {
    pub(crate) fn fresh(
        token: String,
        lifetime: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let expires_at = now
            .checked_add_signed(lifetime)
            .ok_or_else(|| SessionError::Lifetime(format!("{}s", lifetime.num_seconds())))?;

        Ok(Self {
            token,
            values: BTreeMap::new(),
            created_at: now,
            last_activity: now,
            expires_at,
            status: SessionStatus::Modified,
            is_new: true,
            rotated: false,
        })
    }

    pub(crate) fn from_record(token: String, record: SessionRecord, now: DateTime<Utc>) -> Self {
        Self {
            token,
            values: record.values,
            created_at: record.created_at,
            last_activity: now,
            expires_at: record.expires_at,
            status: SessionStatus::Unmodified,
            is_new: false,
            rotated: false,
        }
    }

    pub(crate) fn to_record(&self) -> SessionRecord {
        SessionRecord {
            values: self.values.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_dirty(&self) -> bool {
        self.status == SessionStatus::Modified
    }

    pub fn is_destroyed(&self) -> bool {
        self.status == SessionStatus::Destroyed
    }

    /// Created while handling the current request: the client never held this token.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// The token was rotated while handling the current request.
    pub fn was_rotated(&self) -> bool {
        self.rotated
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    fn writable(&self, key: &str) -> bool {
        if self.is_destroyed() {
            tracing::warn!("Ignoring write of '{}' to a destroyed session", key);
            return false;
        }
        true
    }

    /// Store `value` under `key` and mark the session dirty.
    pub fn put<V: Serialize>(&mut self, key: &str, value: V) -> Result<(), SessionError> {
        if !self.writable(key) {
            return Ok(());
        }
        let value = serde_json::to_value(value).map_err(|e| SessionError::Serde(e.to_string()))?;
        self.values.insert(key.to_string(), value);
        self.status = SessionStatus::Modified;
        Ok(())
    }

    /// `None` when the key is absent or holds a value of another type.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.values.get(key)?;
        serde_json::from_value(value.clone()).ok()
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Remove `key`. The session becomes dirty only if the key was present.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        if !self.writable(key) {
            return None;
        }
        let removed = self.values.remove(key);
        if removed.is_some() {
            self.status = SessionStatus::Modified;
        }
        removed
    }

    /// Read-once string value, e.g. a flash message.
    pub fn pop_string(&mut self, key: &str) -> Option<String> {
        match self.remove(key)? {
            serde_json::Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.get_string(CSRF_TOKEN_KEY)
    }

    /// The logged-in user id, if one is recorded and non-empty.
    pub fn authenticated_user_id(&self) -> Option<&str> {
        self.get_string(AUTH_USER_ID_KEY).filter(|id| !id.is_empty())
    }
}
