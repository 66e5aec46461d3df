//! Assessment Server - editor session service for assessment questions.
//!
//! This server keeps one assessment-engine editor per open session and
//! exposes its reads, edits, reorders and commits over HTTP. Questions are
//! persisted by the admin backend, reached through [`backend::HttpBackend`].

mod backend;
mod config;
mod error;
mod handlers;
mod routes;
mod sessions;

use crate::backend::HttpBackend;
use crate::config::Config;
use crate::sessions::SessionManager;
use assessment_engine::{Persistence, Schema};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub backend: Arc<dyn Persistence>,
    pub schema: Arc<Schema>,
}

/// Build the router with its middleware stack.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "assessment_server=debug,assessment_engine=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    let schema = config.load_catalog()?;

    tracing::info!(
        "Starting Assessment Server on {}:{} (backend {}, {} categories)",
        config.host,
        config.port,
        config.backend_url,
        schema.categories.len()
    );

    // Build application state
    let backend = HttpBackend::new(&config.backend_url, config.backend_token.clone())?;
    let state = AppState {
        sessions: SessionManager::new_shared(),
        backend: Arc::new(backend),
        schema: Arc::new(schema),
    };

    let app = build_router(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
