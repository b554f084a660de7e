mod config;
mod errors;
mod main;
mod types;

pub use config::{AUTH_USER_ID_KEY, CSRF_FORM_FIELD, CSRF_HEADER_NAME, CSRF_TOKEN_KEY};
pub use errors::SessionError;
pub use main::{SessionManager, ensure_csrf_token, verify_csrf_token};
pub use types::{Session, SessionStatus};
