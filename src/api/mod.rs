//! HTTP API server module
//!
//! REST endpoints over the pipeline controller, mounted under `/api`.

pub mod error;
pub mod handlers;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::pipeline::Pipeline;

pub use error::ApiError;
pub use routes::create_router;

/// Shared application state for HTTP handlers
pub struct AppState {
    /// Single writer; every request takes the lock for the duration of one operation
    pub pipeline: Mutex<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Mutex::new(pipeline),
        }
    }
}

/// Router with CORS open to any origin, as served by [`start_server`]
pub fn app(pipeline: Pipeline) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    create_router(Arc::new(AppState::new(pipeline))).layer(cors)
}

/// Start the HTTP API server and run until the listener fails
pub async fn start_server(pipeline: Pipeline, host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid API address {}:{}", host, port))?;

    if host == "0.0.0.0" {
        log::warn!("Server binding to 0.0.0.0 - accessible from network");
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server on {}", addr))?;

    log::info!("HTTP API server listening on http://{}", addr);
    println!("Pipeline board API listening on http://{}", addr);

    axum::serve(listener, app(pipeline))
        .await
        .context("HTTP server error")?;
    Ok(())
}
