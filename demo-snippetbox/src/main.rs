use std::sync::Arc;

use sessionkit::{InMemoryUserStore, SessionConfig, SessionManager};
use sessionkit_axum::{Pipeline, PipelineConfig};

mod config;
mod handlers;
mod models;
mod routes;
mod server;

use crate::{config::AppConfig, handlers::AppState, models::SnippetModel};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    server::init_tracing(env!("CARGO_CRATE_NAME"));

    let config = AppConfig::from_env();
    let store = config.session_store().await?;

    let sessions = SessionManager::new(SessionConfig::from_env(), store);
    let users = Arc::new(InMemoryUserStore::new());
    let pipeline = Pipeline::new(sessions, users.clone(), PipelineConfig::from_env());

    let state = Arc::new(AppState {
        pipeline,
        users,
        snippets: SnippetModel::default(),
    });

    let server = server::spawn_http_server(config.addr, routes::routes(state));
    server.await?;
    Ok(())
}
