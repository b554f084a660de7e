use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;
use http::header::{
    CONTENT_SECURITY_POLICY, HeaderMap, HeaderValue, REFERRER_POLICY,
    X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS, X_XSS_PROTECTION,
};

use crate::chain::{Interceptor, Next};
use crate::context::RequestContext;
use crate::error::PipelineError;

const CSP: &str =
    "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com";

fn apply(headers: &mut HeaderMap) {
    headers.insert(CONTENT_SECURITY_POLICY, HeaderValue::from_static(CSP));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("origin-when-cross-origin"),
    );
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("deny"));
    headers.insert(X_XSS_PROTECTION, HeaderValue::from_static("0"));
}

/// Browser hardening headers on every response, including the 500 written
/// by [`crate::RecoverPanic`].
pub struct SecureHeaders;

#[async_trait]
impl Interceptor for SecureHeaders {
    async fn intercept(
        &self,
        req: Request,
        ctx: &mut RequestContext,
        next: Next<'_>,
    ) -> Result<Response, PipelineError> {
        apply(ctx.fallback_headers_mut());
        let mut response = next.run(req, ctx).await?;
        apply(response.headers_mut());
        Ok(response)
    }
}
