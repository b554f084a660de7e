mod errors;
mod session_store;
mod types;

pub use errors::StorageError;
pub use session_store::{InMemorySessionStore, RedisSessionStore, SqliteSessionStore};
pub use types::{SessionRecord, SessionStore};
