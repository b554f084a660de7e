mod auth;
mod csrf;
mod headers;
mod logging;
mod recover;
mod session;

pub use auth::{AuthGate, RequireAuthenticated};
pub use csrf::CsrfGuard;
pub use headers::SecureHeaders;
pub use logging::LogRequest;
pub use recover::RecoverPanic;
pub use session::LoadAndSave;
