//! sessionkit-axum - request pipeline for session-backed axum applications
//!
//! Requests pass through an ordered [`Chain`] of [`Interceptor`]s before
//! reaching a [`Handler`]. The interceptors provided here load and commit the
//! session, check the CSRF token on state-changing requests, evaluate and
//! enforce authentication, add security headers and turn panics into a 500.
//!
//! ```ignore
//! let pipeline = Pipeline::new(sessions, users, PipelineConfig::from_env());
//! let app = Router::new()
//!     .route("/", get_service(pipeline.dynamic_chain().then(Home)))
//!     .route("/snippet/create", post_service(pipeline.protected_chain().then(CreateSnippet)));
//! ```

mod chain;
mod config;
mod context;
mod error;
mod middleware;
mod pipeline;

#[cfg(test)]
mod test_utils;

pub use chain::{Chain, Endpoint, Handler, Interceptor, Next};
pub use config::PipelineConfig;
pub use context::{Rejection, RequestContext, Stage};
pub use error::{IntoPipelineError, PipelineError};
pub use middleware::{
    AuthGate, CsrfGuard, LoadAndSave, LogRequest, RecoverPanic, RequireAuthenticated,
    SecureHeaders,
};
pub use pipeline::Pipeline;
