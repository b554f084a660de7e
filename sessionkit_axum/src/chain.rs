//! Ordered interceptor chains ending in a handler
//!
//! A [`Chain`] is a list of [`Interceptor`]s applied outermost first. Calling
//! [`Chain::then`] seals it with a [`Handler`] and yields an [`Endpoint`], a
//! `tower::Service` that can be mounted on an axum route:
//!
//! ```ignore
//! let endpoint = Chain::new()
//!     .with(RecoverPanic)
//!     .with(LogRequest)
//!     .then(Home);
//! let app = Router::new().route("/", get_service(endpoint));
//! ```

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;
use tower::Service;

use crate::context::{RequestContext, Stage};
use crate::error::{PipelineError, internal_error_response};

/// A step wrapped around the rest of the chain.
///
/// Implementations either answer the request themselves or call
/// [`Next::run`] exactly once.
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    async fn intercept(
        &self,
        req: Request,
        ctx: &mut RequestContext,
        next: Next<'_>,
    ) -> Result<Response, PipelineError>;
}

/// The terminal request handler.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, req: Request, ctx: &mut RequestContext)
    -> Result<Response, PipelineError>;
}

/// The remainder of a chain, as seen from inside an interceptor.
pub struct Next<'a> {
    rest: &'a [Arc<dyn Interceptor>],
    handler: &'a dyn Handler,
}

impl Next<'_> {
    /// Invoke the next interceptor, or the handler once none are left.
    pub async fn run(
        self,
        req: Request,
        ctx: &mut RequestContext,
    ) -> Result<Response, PipelineError> {
        match self.rest.split_first() {
            Some((head, rest)) => {
                let next = Next {
                    rest,
                    handler: self.handler,
                };
                head.intercept(req, ctx, next).await
            }
            None => {
                let response = self.handler.call(req, ctx).await?;
                ctx.advance(Stage::Handled)?;
                Ok(response)
            }
        }
    }
}

/// An ordered list of interceptors, outermost first.
#[derive(Clone, Default)]
pub struct Chain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an interceptor inside the existing ones.
    pub fn with<I: Interceptor>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// A new chain running `self` and then `other`; both inputs stay usable.
    pub fn append(&self, other: &Chain) -> Chain {
        let mut interceptors = self.interceptors.clone();
        interceptors.extend(other.interceptors.iter().cloned());
        Chain { interceptors }
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub fn then<H: Handler>(&self, handler: H) -> Endpoint {
        Endpoint {
            interceptors: self.interceptors.clone().into(),
            handler: Arc::new(handler),
        }
    }
}

/// A sealed chain. Each call gets its own [`RequestContext`].
#[derive(Clone)]
pub struct Endpoint {
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    handler: Arc<dyn Handler>,
}

impl Endpoint {
    pub async fn handle(&self, req: Request) -> Response {
        let mut ctx = RequestContext::new();
        let next = Next {
            rest: &self.interceptors,
            handler: self.handler.as_ref(),
        };

        match next.run(req, &mut ctx).await {
            Ok(response) => response,
            Err(e) => {
                // Only reached by chains without RecoverPanic
                tracing::error!(request_id = %ctx.request_id(), "Unhandled pipeline error: {e}");
                internal_error_response(&mut ctx)
            }
        }
    }
}

impl Service<Request> for Endpoint {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let endpoint = self.clone();
        Box::pin(async move { Ok(endpoint.handle(req).await) })
    }
}
