use std::collections::HashMap;
use std::num::NonZeroU32;

use async_trait::async_trait;
use chrono::Utc;
use ring::pbkdf2;
use tokio::sync::RwLock;

use super::errors::UserError;
use super::types::{User, UserStore};
use crate::utils::random_bytes;

static PBKDF2_ALG: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;
const DEFAULT_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

struct StoredUser {
    user: User,
    salt: [u8; SALT_LEN],
    hash: [u8; HASH_LEN],
}

/// Process-local user records with PBKDF2 password hashes.
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, StoredUser>>,
    iterations: NonZeroU32,
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::with_iterations(DEFAULT_ITERATIONS)
    }

    /// Lower iteration counts are only meant for tests.
    pub fn with_iterations(iterations: u32) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            iterations: NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN),
        }
    }

    fn derive(&self, salt: &[u8], password: &str) -> [u8; HASH_LEN] {
        let mut hash = [0u8; HASH_LEN];
        pbkdf2::derive(
            PBKDF2_ALG,
            self.iterations,
            salt,
            password.as_bytes(),
            &mut hash,
        );
        hash
    }

    /// Register a new active user. Emails are compared case-insensitively.
    pub async fn insert(&self, name: &str, email: &str, password: &str) -> Result<User, UserError> {
        let email = email.trim().to_lowercase();
        if name.trim().is_empty() || email.is_empty() || password.is_empty() {
            return Err(UserError::InvalidInput(
                "name, email and password are required".to_string(),
            ));
        }

        let salt = random_bytes::<SALT_LEN>()?;
        let hash = self.derive(&salt, password);

        let mut users = self.users.write().await;
        if users.values().any(|stored| stored.user.email == email) {
            return Err(UserError::DuplicateEmail);
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email,
            active: true,
            created_at: Utc::now(),
        };
        users.insert(
            user.id.clone(),
            StoredUser {
                user: user.clone(),
                salt,
                hash,
            },
        );

        tracing::debug!("Inserted user {}", user.id);
        Ok(user)
    }

    /// The id of the active user with these credentials, if any.
    pub async fn authenticate(&self, email: &str, password: &str) -> Option<String> {
        let email = email.trim().to_lowercase();
        let users = self.users.read().await;
        let stored = users.values().find(|stored| stored.user.email == email)?;

        if !stored.user.active {
            tracing::debug!("Rejected login for deactivated user {}", stored.user.id);
            return None;
        }

        pbkdf2::verify(
            PBKDF2_ALG,
            self.iterations,
            &stored.salt,
            password.as_bytes(),
            &stored.hash,
        )
        .ok()
        .map(|_| stored.user.id.clone())
    }

    /// Mark a user inactive. Returns false if no such user exists.
    pub async fn deactivate(&self, id: &str) -> bool {
        match self.users.write().await.get_mut(id) {
            Some(stored) => {
                stored.user.active = false;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, UserError> {
        Ok(self
            .users
            .read()
            .await
            .get(id)
            .map(|stored| stored.user.clone()))
    }
}
