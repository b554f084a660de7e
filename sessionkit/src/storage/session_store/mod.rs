mod memory;
mod redis;
mod sqlite;

pub use memory::InMemorySessionStore;
pub use redis::RedisSessionStore;
pub use sqlite::SqliteSessionStore;
