use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;
use futures_util::FutureExt;
use http::header::{HeaderValue, SET_COOKIE};

use crate::chain::{Interceptor, Next};
use crate::context::{Rejection, RequestContext, Stage};
use crate::error::PipelineError;
use crate::pipeline::Pipeline;

/// Resolves the request's session before the rest of the chain runs and
/// commits it once afterwards.
///
/// The commit also happens when the inner chain fails or panics, so values
/// written before the failure (a flash message, say) are persisted. In that
/// case the cookie travels in the context's fallback headers and the panic
/// is resumed for [`crate::RecoverPanic`]. CSRF-rejected requests are never
/// committed.
pub struct LoadAndSave {
    pipeline: Arc<Pipeline>,
}

impl LoadAndSave {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    async fn commit(&self, ctx: &mut RequestContext) -> Result<Option<HeaderValue>, PipelineError> {
        let Some(session) = ctx.session_mut() else {
            return Ok(None);
        };
        Ok(self.pipeline.sessions().commit(session).await?)
    }

    /// Commit on the failure path. Errors are logged, not returned.
    async fn commit_best_effort(&self, ctx: &mut RequestContext) {
        match self.commit(ctx).await {
            Ok(Some(cookie)) => {
                ctx.fallback_headers_mut().append(SET_COOKIE, cookie);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(request_id = %ctx.request_id(), "Session commit after failure failed: {e}");
            }
        }
    }
}

#[async_trait]
impl Interceptor for LoadAndSave {
    async fn intercept(
        &self,
        req: Request,
        ctx: &mut RequestContext,
        next: Next<'_>,
    ) -> Result<Response, PipelineError> {
        let sessions = self.pipeline.sessions();
        let session = sessions
            .resolve(sessions.session_cookie(req.headers()))
            .await?;
        ctx.session = Some(session);
        ctx.advance(Stage::SessionResolved)?;

        let outcome = AssertUnwindSafe(next.run(req, ctx)).catch_unwind().await;

        if ctx.rejection() == Some(Rejection::Csrf) {
            tracing::debug!(request_id = %ctx.request_id(), "CSRF rejection, session not committed");
            return match outcome {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            };
        }

        match outcome {
            Ok(Ok(mut response)) => {
                if let Some(cookie) = self.commit(ctx).await? {
                    response.headers_mut().append(SET_COOKIE, cookie);
                }
                if !ctx.is_rejected() {
                    ctx.advance(Stage::Committed)?;
                }
                Ok(response)
            }
            Ok(Err(e)) => {
                self.commit_best_effort(ctx).await;
                Err(e)
            }
            Err(panic) => {
                self.commit_best_effort(ctx).await;
                std::panic::resume_unwind(panic)
            }
        }
    }
}
