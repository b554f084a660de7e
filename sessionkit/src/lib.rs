//! sessionkit - server-side session state for cookie-authenticated web apps
//!
//! This crate owns the session lifecycle (creation, token rotation, absolute
//! expiry, destruction), the anti-forgery token bound to each session, the
//! pluggable session store backends and the user-record lookup used to decide
//! whether a session is authenticated.

mod config;
mod session;
mod storage;
mod userdb;
mod utils;

pub use config::SessionConfig;

pub use session::{
    AUTH_USER_ID_KEY, CSRF_FORM_FIELD, CSRF_HEADER_NAME, CSRF_TOKEN_KEY, Session, SessionError,
    SessionManager, SessionStatus, ensure_csrf_token, verify_csrf_token,
};

pub use storage::{
    InMemorySessionStore, RedisSessionStore, SessionRecord, SessionStore, SqliteSessionStore,
    StorageError,
};

pub use userdb::{InMemoryUserStore, User, UserError, UserStore};

pub use utils::{UtilError, gen_random_string};
