use std::sync::Arc;

use askama::Template;
use async_trait::async_trait;
use axum::extract::{Form, FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use chrono::Datelike;
use serde::Deserialize;

use sessionkit::{AUTH_USER_ID_KEY, InMemoryUserStore, UserError};
use sessionkit_axum::{Handler, IntoPipelineError, Pipeline, PipelineError, RequestContext};

use crate::models::SnippetModel;

const FLASH_KEY: &str = "flash";
const MIN_PASSWORD_LEN: usize = 8;
const MAX_TITLE_LEN: usize = 100;

pub(crate) struct AppState {
    pub(crate) pipeline: Arc<Pipeline>,
    pub(crate) users: Arc<InMemoryUserStore>,
    pub(crate) snippets: SnippetModel,
}

/// Fields shared by every page layout
pub(crate) struct PageMeta {
    flash: String,
    authenticated: bool,
    csrf_token: String,
    current_year: i32,
}

impl PageMeta {
    /// Reads (and consumes) the pending flash message.
    fn new(ctx: &mut RequestContext) -> Self {
        let flash = ctx
            .session_mut()
            .and_then(|s| s.pop_string(FLASH_KEY))
            .unwrap_or_default();
        Self {
            flash,
            authenticated: ctx.authenticated(),
            csrf_token: ctx.csrf_token().unwrap_or_default().to_string(),
            current_year: chrono::Utc::now().year(),
        }
    }
}

fn render<T: Template>(template: &T, status: StatusCode) -> Result<Response, PipelineError> {
    let html = template.render().into_pipeline_error()?;
    Ok((status, Html(html)).into_response())
}

async fn parse_form<T>(req: Request) -> Result<T, PipelineError>
where
    T: serde::de::DeserializeOwned + Send,
{
    let Form(form) = Form::<T>::from_request(req, &())
        .await
        .map_err(|e| PipelineError::Body(e.to_string()))?;
    Ok(form)
}

fn set_flash(ctx: &mut RequestContext, message: &str) -> Result<(), PipelineError> {
    ctx.require_session()?.put(FLASH_KEY, message)?;
    Ok(())
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    meta: PageMeta,
    snippets: Vec<crate::models::Snippet>,
}

pub(crate) struct Home(pub(crate) Arc<AppState>);

#[async_trait]
impl Handler for Home {
    async fn call(&self, _req: Request, ctx: &mut RequestContext) -> Result<Response, PipelineError> {
        let template = HomeTemplate {
            meta: PageMeta::new(ctx),
            snippets: self.0.snippets.latest(10).await,
        };
        render(&template, StatusCode::OK)
    }
}

#[derive(Template)]
#[template(path = "view.html")]
struct ViewTemplate {
    meta: PageMeta,
    snippet: crate::models::Snippet,
}

#[derive(Template)]
#[template(path = "not_found.html")]
struct NotFoundTemplate;

/// Fallback for unknown routes and missing snippets
pub(crate) struct NotFound;

#[async_trait]
impl Handler for NotFound {
    async fn call(&self, _req: Request, _ctx: &mut RequestContext) -> Result<Response, PipelineError> {
        render(&NotFoundTemplate, StatusCode::NOT_FOUND)
    }
}

pub(crate) struct SnippetView(pub(crate) Arc<AppState>);

#[async_trait]
impl Handler for SnippetView {
    async fn call(&self, req: Request, ctx: &mut RequestContext) -> Result<Response, PipelineError> {
        let id = req
            .uri()
            .path()
            .rsplit('/')
            .next()
            .and_then(|id| id.parse::<u64>().ok())
            .filter(|id| *id > 0);

        let snippet = match id {
            Some(id) => self.0.snippets.get(id).await,
            None => None,
        };
        let Some(snippet) = snippet else {
            return render(&NotFoundTemplate, StatusCode::NOT_FOUND);
        };

        let template = ViewTemplate {
            meta: PageMeta::new(ctx),
            snippet,
        };
        render(&template, StatusCode::OK)
    }
}

#[derive(Template)]
#[template(path = "create.html")]
struct CreateTemplate {
    meta: PageMeta,
    errors: Vec<String>,
    title: String,
    content: String,
    expires: i64,
}

#[derive(Debug, Deserialize)]
struct CreateForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    expires: i64,
}

impl CreateForm {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push("Title cannot be blank".to_string());
        } else if self.title.chars().count() > MAX_TITLE_LEN {
            errors.push(format!("Title cannot be more than {MAX_TITLE_LEN} characters long"));
        }
        if self.content.trim().is_empty() {
            errors.push("Content cannot be blank".to_string());
        }
        if ![1, 7, 365].contains(&self.expires) {
            errors.push("Expiry must be 1, 7 or 365 days".to_string());
        }
        errors
    }
}

pub(crate) struct SnippetCreate;

#[async_trait]
impl Handler for SnippetCreate {
    async fn call(&self, _req: Request, ctx: &mut RequestContext) -> Result<Response, PipelineError> {
        let template = CreateTemplate {
            meta: PageMeta::new(ctx),
            errors: Vec::new(),
            title: String::new(),
            content: String::new(),
            expires: 365,
        };
        render(&template, StatusCode::OK)
    }
}

pub(crate) struct SnippetCreatePost(pub(crate) Arc<AppState>);

#[async_trait]
impl Handler for SnippetCreatePost {
    async fn call(&self, req: Request, ctx: &mut RequestContext) -> Result<Response, PipelineError> {
        let form: CreateForm = parse_form(req).await?;

        let errors = form.validate();
        if !errors.is_empty() {
            let template = CreateTemplate {
                meta: PageMeta::new(ctx),
                errors,
                title: form.title,
                content: form.content,
                expires: form.expires,
            };
            return render(&template, StatusCode::UNPROCESSABLE_ENTITY);
        }

        let id = self
            .0
            .snippets
            .insert(form.title.trim(), &form.content, form.expires)
            .await;
        set_flash(ctx, "Snippet successfully created!")?;
        Ok(Redirect::to(&format!("/snippet/view/{id}")).into_response())
    }
}

#[derive(Template)]
#[template(path = "signup.html")]
struct SignupTemplate {
    meta: PageMeta,
    errors: Vec<String>,
    name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct SignupForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

pub(crate) struct Signup;

#[async_trait]
impl Handler for Signup {
    async fn call(&self, _req: Request, ctx: &mut RequestContext) -> Result<Response, PipelineError> {
        let template = SignupTemplate {
            meta: PageMeta::new(ctx),
            errors: Vec::new(),
            name: String::new(),
            email: String::new(),
        };
        render(&template, StatusCode::OK)
    }
}

pub(crate) struct SignupPost(pub(crate) Arc<AppState>);

#[async_trait]
impl Handler for SignupPost {
    async fn call(&self, req: Request, ctx: &mut RequestContext) -> Result<Response, PipelineError> {
        let form: SignupForm = parse_form(req).await?;

        let mut errors = Vec::new();
        if form.password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long"
            ));
        } else {
            match self
                .0
                .users
                .insert(&form.name, &form.email, &form.password)
                .await
            {
                Ok(user) => {
                    tracing::info!("Registered user {}", user.id);
                    set_flash(ctx, "Your signup was successful. Please log in.")?;
                    return Ok(Redirect::to("/user/login").into_response());
                }
                Err(UserError::DuplicateEmail) => {
                    errors.push("Email address is already in use".to_string())
                }
                Err(UserError::InvalidInput(msg)) => errors.push(msg),
                Err(e) => return Err(e.into()),
            }
        }

        let template = SignupTemplate {
            meta: PageMeta::new(ctx),
            errors,
            name: form.name,
            email: form.email,
        };
        render(&template, StatusCode::UNPROCESSABLE_ENTITY)
    }
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    meta: PageMeta,
    errors: Vec<String>,
    email: String,
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

pub(crate) struct Login;

#[async_trait]
impl Handler for Login {
    async fn call(&self, _req: Request, ctx: &mut RequestContext) -> Result<Response, PipelineError> {
        let template = LoginTemplate {
            meta: PageMeta::new(ctx),
            errors: Vec::new(),
            email: String::new(),
        };
        render(&template, StatusCode::OK)
    }
}

pub(crate) struct LoginPost(pub(crate) Arc<AppState>);

#[async_trait]
impl Handler for LoginPost {
    async fn call(&self, req: Request, ctx: &mut RequestContext) -> Result<Response, PipelineError> {
        let form: LoginForm = parse_form(req).await?;

        let Some(user_id) = self.0.users.authenticate(&form.email, &form.password).await else {
            let template = LoginTemplate {
                meta: PageMeta::new(ctx),
                errors: vec!["Email or password is incorrect".to_string()],
                email: form.email,
            };
            return render(&template, StatusCode::UNPROCESSABLE_ENTITY);
        };

        // Privilege change: new token before recording the user
        let session = ctx.require_session()?;
        self.0.pipeline.sessions().rotate(session).await?;
        session.put(AUTH_USER_ID_KEY, &user_id)?;

        tracing::info!("User {} logged in", user_id);
        Ok(Redirect::to("/snippet/create").into_response())
    }
}

pub(crate) struct LogoutPost(pub(crate) Arc<AppState>);

#[async_trait]
impl Handler for LogoutPost {
    async fn call(&self, _req: Request, ctx: &mut RequestContext) -> Result<Response, PipelineError> {
        self.0
            .pipeline
            .sessions()
            .destroy(ctx.require_session()?)
            .await?;
        Ok(Redirect::to("/").into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(title: &str, content: &str, expires: i64) -> CreateForm {
        CreateForm {
            title: title.to_string(),
            content: content.to_string(),
            expires,
        }
    }

    #[test]
    fn test_create_form_validation() {
        assert!(form("Title", "Body", 7).validate().is_empty());
        assert_eq!(form("", "Body", 7).validate().len(), 1);
        assert_eq!(form("Title", " ", 3).validate().len(), 2);
        assert_eq!(form(&"x".repeat(101), "Body", 1).validate().len(), 1);
    }
}
