//! Shared helpers for the unit tests in this crate

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use http::header::{CONTENT_TYPE, COOKIE};

use sessionkit::{InMemorySessionStore, InMemoryUserStore, SessionConfig, SessionManager};

use crate::chain::Handler;
use crate::config::PipelineConfig;
use crate::context::RequestContext;
use crate::error::PipelineError;
use crate::pipeline::Pipeline;

type HandlerFn = dyn Fn(&mut RequestContext) -> Result<Response, PipelineError> + Send + Sync;

/// Synchronous handler built from a closure
pub(crate) struct FnHandler(Box<HandlerFn>);

impl FnHandler {
    pub(crate) fn new<F>(f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> Result<Response, PipelineError> + Send + Sync + 'static,
    {
        Self(Box::new(f))
    }

    pub(crate) fn ok() -> Self {
        Self::new(|_| Ok(Response::new(Body::from("ok"))))
    }
}

#[async_trait]
impl Handler for FnHandler {
    async fn call(
        &self,
        _req: Request,
        ctx: &mut RequestContext,
    ) -> Result<Response, PipelineError> {
        (self.0)(ctx)
    }
}

/// Pipeline over in-memory stores, with cheap password hashing
pub(crate) fn test_pipeline() -> (Arc<Pipeline>, Arc<InMemorySessionStore>, Arc<InMemoryUserStore>) {
    let store = Arc::new(InMemorySessionStore::new());
    let users = Arc::new(InMemoryUserStore::with_iterations(1_000));
    let sessions = SessionManager::new(SessionConfig::default(), store.clone());
    let pipeline = Pipeline::new(sessions, users.clone(), PipelineConfig::default());
    (pipeline, store, users)
}

pub(crate) fn get(uri: &str) -> Request {
    http::Request::get(uri).body(Body::empty()).unwrap()
}

pub(crate) fn get_with_cookie(uri: &str, cookie: &str) -> Request {
    http::Request::get(uri)
        .header(COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

pub(crate) fn post_form(uri: &str, cookie: Option<&str>, form: &str) -> Request {
    let mut builder = http::Request::post(uri).header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

/// `name=value` from the response's first Set-Cookie header
pub(crate) fn cookie_pair(response: &Response) -> Option<String> {
    let header = response.headers().get(http::header::SET_COOKIE)?;
    let pair = header.to_str().ok()?.split(';').next()?;
    Some(pair.trim().to_string())
}

pub(crate) async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
