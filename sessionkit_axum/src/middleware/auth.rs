use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::{IntoResponse, Redirect, Response};
use http::header::{CACHE_CONTROL, HeaderValue};

use sessionkit::Session;

use crate::chain::{Interceptor, Next};
use crate::context::{Rejection, RequestContext, Stage};
use crate::error::PipelineError;
use crate::pipeline::Pipeline;

/// Decides whether the request belongs to a logged-in, active user.
pub struct AuthGate {
    pipeline: Arc<Pipeline>,
}

impl AuthGate {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    /// True iff the session names a user id and that user exists and is active.
    ///
    /// The user lookup is done at most once per request and cached in `ctx`.
    pub async fn authenticated(&self, ctx: &mut RequestContext) -> Result<bool, PipelineError> {
        if ctx.user.is_none() {
            let user_id = ctx
                .session()
                .and_then(Session::authenticated_user_id)
                .map(str::to_string);

            let user = match user_id {
                Some(id) => {
                    let user = self.pipeline.users().find_by_id(&id).await?;
                    if user.is_none() {
                        tracing::debug!("Session names unknown user {}", id);
                    }
                    user
                }
                None => None,
            };
            ctx.user = Some(user);
        }

        Ok(matches!(&ctx.user, Some(Some(user)) if user.active))
    }
}

#[async_trait]
impl Interceptor for AuthGate {
    async fn intercept(
        &self,
        req: Request,
        ctx: &mut RequestContext,
        next: Next<'_>,
    ) -> Result<Response, PipelineError> {
        ctx.authenticated = self.authenticated(ctx).await?;
        ctx.advance(Stage::AuthEvaluated)?;
        next.run(req, ctx).await
    }
}

/// Redirects unauthenticated requests to the login page.
///
/// Must sit directly inside [`AuthGate`]. Successful responses are marked
/// `Cache-Control: no-store` so protected pages are not cached.
pub struct RequireAuthenticated {
    pipeline: Arc<Pipeline>,
}

impl RequireAuthenticated {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Interceptor for RequireAuthenticated {
    async fn intercept(
        &self,
        req: Request,
        ctx: &mut RequestContext,
        next: Next<'_>,
    ) -> Result<Response, PipelineError> {
        if ctx.stage() != Stage::AuthEvaluated {
            return Err(PipelineError::StageOrder {
                from: ctx.stage(),
                to: Stage::AuthGatePassed,
            });
        }

        if !ctx.authenticated() {
            ctx.reject(Rejection::Unauthenticated)?;
            tracing::info!(
                request_id = %ctx.request_id(),
                method = %req.method(),
                uri = %req.uri(),
                "Unauthenticated request redirected to login"
            );
            return Ok(Redirect::to(&self.pipeline.config().login_path).into_response());
        }

        ctx.advance(Stage::AuthGatePassed)?;
        let mut response = next.run(req, ctx).await?;
        response
            .headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Chain;
    use crate::middleware::{CsrfGuard, LoadAndSave};
    use crate::test_utils::{FnHandler, cookie_pair, get, get_with_cookie, test_pipeline};
    use axum::body::Body;
    use http::StatusCode;
    use http::header::LOCATION;
    use sessionkit::AUTH_USER_ID_KEY;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Cookie for a committed session logged in as `user_id`
    async fn logged_in_cookie(pipeline: &Arc<Pipeline>, user_id: &str) -> String {
        let user_id = user_id.to_string();
        let endpoint = Chain::new()
            .with(LoadAndSave::new(pipeline.clone()))
            .then(FnHandler::new(move |ctx| {
                ctx.require_session()?.put(AUTH_USER_ID_KEY, &user_id)?;
                Ok(Response::new(Body::empty()))
            }));
        let response = endpoint.oneshot(get("/")).await.unwrap();
        cookie_pair(&response).unwrap()
    }

    fn protected(pipeline: &Arc<Pipeline>, calls: Arc<AtomicUsize>) -> crate::Endpoint {
        Chain::new()
            .with(LoadAndSave::new(pipeline.clone()))
            .with(CsrfGuard::new(pipeline.clone()))
            .with(AuthGate::new(pipeline.clone()))
            .with(RequireAuthenticated::new(pipeline.clone()))
            .then(FnHandler::new(move |ctx| {
                calls.fetch_add(1, Ordering::SeqCst);
                assert_eq!(ctx.stage(), Stage::AuthGatePassed);
                assert!(ctx.user().is_some());
                Ok(Response::new(Body::from("secret")))
            }))
    }

    #[tokio::test]
    async fn test_anonymous_request_redirected() {
        let (pipeline, _, _) = test_pipeline();
        let calls = Arc::new(AtomicUsize::new(0));

        let response = protected(&pipeline, calls.clone())
            .oneshot(get("/snippet/create"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/user/login");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_active_user_passes_with_no_store() {
        // Given a session logged in as an existing user
        let (pipeline, _, users) = test_pipeline();
        let user = users.insert("Alice", "alice@example.com", "pw").await.unwrap();
        let cookie = logged_in_cookie(&pipeline, &user.id).await;
        let calls = Arc::new(AtomicUsize::new(0));

        // When requesting a protected page
        let response = protected(&pipeline, calls.clone())
            .oneshot(get_with_cookie("/snippet/create", &cookie))
            .await
            .unwrap();

        // Then the handler runs and the response is not cacheable
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CACHE_CONTROL], "no-store");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_authenticated() {
        let (pipeline, _, _) = test_pipeline();
        let cookie = logged_in_cookie(&pipeline, "ghost").await;
        let calls = Arc::new(AtomicUsize::new(0));

        let response = protected(&pipeline, calls.clone())
            .oneshot(get_with_cookie("/snippet/create", &cookie))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_authenticated_lookup_is_cached_per_request() {
        // Given a context whose session names a user
        let (pipeline, _, users) = test_pipeline();
        let user = users.insert("Bob", "bob@example.com", "pw").await.unwrap();
        let mut ctx = RequestContext::new();
        let mut session = pipeline.sessions().resolve(None).await.unwrap();
        session.put(AUTH_USER_ID_KEY, &user.id).unwrap();
        ctx.session = Some(session);
        let gate = AuthGate::new(pipeline.clone());

        assert!(gate.authenticated(&mut ctx).await.unwrap());

        // When the user is deactivated mid-request
        users.deactivate(&user.id).await;

        // Then this request keeps its cached answer
        assert!(gate.authenticated(&mut ctx).await.unwrap());

        // And a new request sees the deactivation
        let mut fresh = RequestContext::new();
        fresh.session = ctx.session.clone();
        assert!(!gate.authenticated(&mut fresh).await.unwrap());
    }

    #[tokio::test]
    async fn test_require_without_gate_is_stage_error() {
        let (pipeline, _, _) = test_pipeline();
        let endpoint = Chain::new()
            .with(LoadAndSave::new(pipeline.clone()))
            .with(RequireAuthenticated::new(pipeline.clone()))
            .then(FnHandler::ok());

        let response = endpoint.oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
