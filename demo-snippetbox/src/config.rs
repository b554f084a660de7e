use std::net::SocketAddr;
use std::sync::Arc;

use sessionkit::{InMemorySessionStore, RedisSessionStore, SessionStore, SqliteSessionStore, StorageError};

const DEFAULT_PORT: u16 = 4000;
const CLEANUP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StoreKind {
    Memory,
    Sqlite,
    Redis,
}

#[derive(Debug, Clone)]
pub(crate) struct AppConfig {
    pub(crate) addr: SocketAddr,
    pub(crate) store: StoreKind,
    pub(crate) store_url: String,
}

impl AppConfig {
    /// `ADDR`, `SESSION_STORE` (memory|sqlite|redis) and `SESSION_STORE_URL`
    pub(crate) fn from_env() -> Self {
        let addr = std::env::var("ADDR")
            .ok()
            .and_then(|a| a.parse().ok())
            .unwrap_or(SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)));

        let store = match std::env::var("SESSION_STORE")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "sqlite" => StoreKind::Sqlite,
            "redis" => StoreKind::Redis,
            _ => StoreKind::Memory,
        };

        let store_url = std::env::var("SESSION_STORE_URL").unwrap_or_else(|_| match store {
            StoreKind::Sqlite => "sqlite://sessions.db".to_string(),
            StoreKind::Redis => "redis://127.0.0.1:6379".to_string(),
            StoreKind::Memory => String::new(),
        });

        Self {
            addr,
            store,
            store_url,
        }
    }

    pub(crate) async fn session_store(&self) -> Result<Arc<dyn SessionStore>, StorageError> {
        match self.store {
            StoreKind::Memory => {
                tracing::info!("Using in-memory session store");
                let store = Arc::new(InMemorySessionStore::new());
                store.clone().spawn_cleanup(CLEANUP_INTERVAL);
                Ok(store)
            }
            StoreKind::Sqlite => {
                tracing::info!("Using SQLite session store at {}", self.store_url);
                let store = Arc::new(SqliteSessionStore::connect(&self.store_url).await?);
                store.clone().spawn_cleanup(CLEANUP_INTERVAL);
                Ok(store)
            }
            StoreKind::Redis => {
                tracing::info!("Using Redis session store at {}", self.store_url);
                Ok(Arc::new(RedisSessionStore::connect(&self.store_url).await?))
            }
        }
    }
}
