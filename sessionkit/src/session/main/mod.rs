mod csrf;
mod manager;

pub use csrf::{ensure_csrf_token, verify_csrf_token};
pub use manager::SessionManager;
