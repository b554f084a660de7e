use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;
use futures_util::FutureExt;

use crate::chain::{Interceptor, Next};
use crate::context::RequestContext;
use crate::error::{PipelineError, internal_error_response};

/// Outermost interceptor: turns panics and errors from the rest of the chain
/// into a generic 500.
///
/// The cause is logged with the request id and never sent to the client.
pub struct RecoverPanic;

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return msg;
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.as_str();
    }
    "non-string panic payload"
}

#[async_trait]
impl Interceptor for RecoverPanic {
    async fn intercept(
        &self,
        req: Request,
        ctx: &mut RequestContext,
        next: Next<'_>,
    ) -> Result<Response, PipelineError> {
        match AssertUnwindSafe(next.run(req, ctx)).catch_unwind().await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                tracing::error!(request_id = %ctx.request_id(), "Request failed: {e}");
                Ok(internal_error_response(ctx))
            }
            Err(payload) => {
                tracing::error!(
                    request_id = %ctx.request_id(),
                    "Request panicked: {}",
                    panic_message(payload.as_ref())
                );
                Ok(internal_error_response(ctx))
            }
        }
    }
}
