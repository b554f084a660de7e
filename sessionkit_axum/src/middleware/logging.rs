use std::net::SocketAddr;

use async_trait::async_trait;
use axum::extract::{ConnectInfo, Request};
use axum::response::Response;

use crate::chain::{Interceptor, Next};
use crate::context::RequestContext;
use crate::error::PipelineError;

/// One access record per request.
///
/// The remote address is only known when the router is served with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub struct LogRequest;

#[async_trait]
impl Interceptor for LogRequest {
    async fn intercept(
        &self,
        req: Request,
        ctx: &mut RequestContext,
        next: Next<'_>,
    ) -> Result<Response, PipelineError> {
        let remote = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
            .unwrap_or_else(|| "-".to_string());

        tracing::info!(
            request_id = %ctx.request_id(),
            remote = %remote,
            proto = ?req.version(),
            method = %req.method(),
            uri = %req.uri(),
            "received request"
        );

        next.run(req, ctx).await
    }
}
