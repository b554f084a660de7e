use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::response::{IntoResponse, Redirect, Response};
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use url::form_urlencoded;

use sessionkit::{CSRF_FORM_FIELD, CSRF_HEADER_NAME, SessionError, ensure_csrf_token, verify_csrf_token};

use crate::chain::{Interceptor, Next};
use crate::context::{Rejection, RequestContext, Stage};
use crate::error::PipelineError;
use crate::pipeline::Pipeline;

/// Rejects state-changing requests that do not carry the session's CSRF token.
///
/// The token is read from the `X-CSRF-Token` header, or failing that from the
/// `csrf_token` field of a urlencoded form body. A request whose session was
/// created by that same request cannot hold a valid token; it is redirected to
/// the login page instead of getting a bare 403.
pub struct CsrfGuard {
    pipeline: Arc<Pipeline>,
}

const X_CSRF_TOKEN: HeaderName = HeaderName::from_static(CSRF_HEADER_NAME);

fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn is_urlencoded_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| {
            mime.trim()
                .eq_ignore_ascii_case("application/x-www-form-urlencoded")
        })
}

impl CsrfGuard {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    /// Find the submitted token. A buffered form body is put back on the
    /// request for the handler; an oversized or unreadable one counts as
    /// no token.
    async fn submitted_token(&self, req: Request) -> (Request, Option<String>) {
        let from_header = req
            .headers()
            .get(X_CSRF_TOKEN)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if from_header.is_some() || !is_urlencoded_form(req.headers()) {
            return (req, from_header);
        }

        let (parts, body) = req.into_parts();
        match axum::body::to_bytes(body, self.pipeline.config().max_form_bytes).await {
            Ok(bytes) => {
                let token = form_urlencoded::parse(&bytes)
                    .find(|(key, _)| key == CSRF_FORM_FIELD)
                    .map(|(_, value)| value.into_owned());
                (Request::from_parts(parts, Body::from(bytes)), token)
            }
            Err(e) => {
                tracing::debug!("Could not buffer form body: {e}");
                (Request::from_parts(parts, Body::empty()), None)
            }
        }
    }

    fn reject(
        &self,
        req: &Request,
        ctx: &mut RequestContext,
        err: SessionError,
    ) -> Result<Response, PipelineError> {
        let fresh_session = ctx.session().is_some_and(|s| s.is_new());
        ctx.reject(Rejection::Csrf)?;
        tracing::info!(
            request_id = %ctx.request_id(),
            method = %req.method(),
            uri = %req.uri(),
            "Rejected request: {err}"
        );

        if fresh_session {
            Ok(Redirect::to(&self.pipeline.config().login_path).into_response())
        } else {
            Ok((StatusCode::FORBIDDEN, "Forbidden").into_response())
        }
    }

    fn add_csrf_header(&self, mut response: Response, ctx: &RequestContext) -> Response {
        if !self.pipeline.config().respond_with_x_csrf_token {
            return response;
        }
        let Some(token) = ctx.csrf_token() else {
            return response;
        };
        match HeaderValue::from_str(token) {
            Ok(value) => {
                response.headers_mut().insert(X_CSRF_TOKEN, value);
            }
            Err(_) => tracing::error!("Failed to create CSRF header value from token"),
        }
        response
    }
}

#[async_trait]
impl Interceptor for CsrfGuard {
    async fn intercept(
        &self,
        req: Request,
        ctx: &mut RequestContext,
        next: Next<'_>,
    ) -> Result<Response, PipelineError> {
        ensure_csrf_token(ctx.require_session()?)?;

        let req = if is_state_changing(req.method()) {
            let (req, submitted) = self.submitted_token(req).await;
            let session = ctx.session().ok_or(PipelineError::NoSession)?;
            if let Err(e) = verify_csrf_token(session, submitted.as_deref()) {
                return self.reject(&req, ctx, e);
            }
            req
        } else {
            req
        };

        ctx.advance(Stage::CsrfChecked)?;
        let response = next.run(req, ctx).await?;
        Ok(self.add_csrf_header(response, ctx))
    }
}
