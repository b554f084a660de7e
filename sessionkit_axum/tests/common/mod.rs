#![allow(dead_code)]

//! Test application shared by the integration tests
//!
//! Mounts a small route table on an axum `Router`, wired through the same
//! chains a real application would use.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::Request;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get_service, post_service};
use http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use url::form_urlencoded;

use sessionkit::{
    AUTH_USER_ID_KEY, InMemorySessionStore, InMemoryUserStore, SessionConfig, SessionManager,
};
use sessionkit_axum::{
    AuthGate, Chain, CsrfGuard, Handler, IntoPipelineError, PipelineConfig, PipelineError,
    Pipeline, RequestContext,
};

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemorySessionStore>,
    pub users: Arc<InMemoryUserStore>,
}

/// `csrf=<token>;auth=<bool>;flash=<value>`
struct Home;

#[async_trait]
impl Handler for Home {
    async fn call(&self, _req: Request, ctx: &mut RequestContext) -> Result<Response, PipelineError> {
        let flash = ctx
            .require_session()?
            .pop_string("flash")
            .unwrap_or_default();
        let body = format!(
            "csrf={};auth={};flash={}",
            ctx.csrf_token().unwrap_or_default(),
            ctx.authenticated(),
            flash
        );
        Ok(body.into_response())
    }
}

async fn read_form(req: Request) -> Result<Vec<(String, String)>, PipelineError> {
    let bytes = axum::body::to_bytes(req.into_body(), usize::MAX)
        .await
        .into_pipeline_error()?;
    Ok(form_urlencoded::parse(&bytes).into_owned().collect())
}

fn field<'a>(form: &'a [(String, String)], name: &str) -> &'a str {
    form.iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .unwrap_or_default()
}

struct Login {
    pipeline: Arc<Pipeline>,
    users: Arc<InMemoryUserStore>,
}

#[async_trait]
impl Handler for Login {
    async fn call(&self, req: Request, ctx: &mut RequestContext) -> Result<Response, PipelineError> {
        let form = read_form(req).await?;
        let Some(user_id) = self
            .users
            .authenticate(field(&form, "email"), field(&form, "password"))
            .await
        else {
            return Ok("invalid credentials".into_response());
        };

        let session = ctx.require_session()?;
        self.pipeline.sessions().rotate(session).await?;
        session.put(AUTH_USER_ID_KEY, user_id)?;
        Ok(Redirect::to("/").into_response())
    }
}

struct Logout {
    pipeline: Arc<Pipeline>,
}

#[async_trait]
impl Handler for Logout {
    async fn call(&self, _req: Request, ctx: &mut RequestContext) -> Result<Response, PipelineError> {
        self.pipeline
            .sessions()
            .destroy(ctx.require_session()?)
            .await?;
        Ok(Redirect::to("/").into_response())
    }
}

struct Created;

#[async_trait]
impl Handler for Created {
    async fn call(&self, _req: Request, _ctx: &mut RequestContext) -> Result<Response, PipelineError> {
        Ok("created".into_response())
    }
}

/// Writes a flash message and then panics
struct Crash;

#[async_trait]
impl Handler for Crash {
    async fn call(&self, _req: Request, ctx: &mut RequestContext) -> Result<Response, PipelineError> {
        ctx.require_session()?.put("flash", "saved")?;
        panic!("handler crashed");
    }
}

/// Fails with a store-style error
struct Broken;

#[async_trait]
impl Handler for Broken {
    async fn call(&self, _req: Request, _ctx: &mut RequestContext) -> Result<Response, PipelineError> {
        Err(PipelineError::Handler("connection refused".to_string()))
    }
}

pub fn test_app() -> TestApp {
    let store = Arc::new(InMemorySessionStore::new());
    let users = Arc::new(InMemoryUserStore::with_iterations(1_000));
    let sessions = SessionManager::new(SessionConfig::default(), store.clone());
    let pipeline = Pipeline::new(sessions, users.clone(), PipelineConfig::default());

    let dynamic = pipeline.dynamic_chain();
    let protected = pipeline.protected_chain();

    // AuthGate placed before CsrfGuard
    let misordered = pipeline.standard_chain().append(
        &Chain::new()
            .with(sessionkit_axum::LoadAndSave::new(pipeline.clone()))
            .with(AuthGate::new(pipeline.clone()))
            .with(CsrfGuard::new(pipeline.clone())),
    );

    let login = Login {
        pipeline: pipeline.clone(),
        users: users.clone(),
    };

    let router = Router::new()
        .route("/", get_service(dynamic.then(Home)))
        .route("/user/login", post_service(dynamic.then(login)))
        .route(
            "/user/logout",
            post_service(protected.then(Logout {
                pipeline: pipeline.clone(),
            })),
        )
        .route(
            "/snippet/create",
            get_service(protected.then(Created)).post_service(protected.then(Created)),
        )
        .route("/crash", get_service(dynamic.then(Crash)))
        .route("/broken", get_service(dynamic.then(Broken)))
        .route("/misordered", get_service(misordered.then(Home)));

    TestApp {
        router,
        store,
        users,
    }
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request {
    let mut builder = http::Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, cookie: Option<&str>, fields: &[(&str, &str)]) -> Request {
    let body = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish();
    let mut builder =
        http::Request::post(uri).header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

/// `session=<token>` from the response's Set-Cookie header
pub fn cookie_pair(response: &Response) -> Option<String> {
    let header = response.headers().get(SET_COOKIE)?.to_str().ok()?;
    Some(header.split(';').next()?.trim().to_string())
}

pub fn token_of(cookie_pair: &str) -> &str {
    cookie_pair.strip_prefix("session=").unwrap_or_default()
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Value of `key` in a `k=v;k=v` home page body
pub fn home_field<'a>(body: &'a str, key: &str) -> &'a str {
    body.split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
        .unwrap_or_default()
}
