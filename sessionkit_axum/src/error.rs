use std::fmt::Display;

use axum::body::Body;
use axum::response::Response;
use http::StatusCode;
use http::header::{CONNECTION, CONTENT_TYPE, HeaderValue};
use thiserror::Error;

use sessionkit::{SessionError, UserError};

use crate::context::{RequestContext, Stage};

/// Failures that escape the handler chain and end up as a 500.
///
/// Invalid sessions, CSRF rejections and unauthenticated access are not
/// errors: they are ordinary responses produced by the interceptors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("User error: {0}")]
    User(#[from] UserError),

    #[error("Request body error: {0}")]
    Body(String),

    #[error("No session attached to the request context")]
    NoSession,

    #[error("Pipeline stage out of order: {from:?} -> {to:?}")]
    StageOrder { from: Stage, to: Stage },

    #[error("Handler error: {0}")]
    Handler(String),
}

/// Helper trait for turning arbitrary handler errors into a [`PipelineError`]
pub trait IntoPipelineError<T> {
    fn into_pipeline_error(self) -> Result<T, PipelineError>;
}

impl<T, E: Display> IntoPipelineError<T> for Result<T, E> {
    fn into_pipeline_error(self) -> Result<T, PipelineError> {
        self.map_err(|e| PipelineError::Handler(e.to_string()))
    }
}

/// The generic 500 written at the recovery boundary.
///
/// Never carries the internal error text. Asks the transport to close the
/// connection and attaches the context's fallback headers (security headers
/// and any session cookie committed while unwinding).
pub(crate) fn internal_error_response(ctx: &mut RequestContext) -> Response {
    let mut response = Response::new(Body::from("Internal Server Error"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;

    let headers = response.headers_mut();
    headers.extend(ctx.take_fallback_headers());
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(CONNECTION, HeaderValue::from_static("close"));
    response
}
