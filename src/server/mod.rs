//! HTTP surface
//!
//! Thin axum layer in front of the orchestrator: `/` status, `/formats`
//! listing and `/download` attachment.

pub mod handlers;

use crate::downloader::orchestrator::Orchestrator;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Fired on shutdown; in-flight acquisitions are abandoned
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            shutdown: CancellationToken::new(),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home_handler))
        .route("/formats", get(handlers::formats_handler))
        .route("/download", get(handlers::download_handler))
        .with_state(state)
}

/// Serve until `state.shutdown` is cancelled.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let shutdown = state.shutdown.clone();
    let app = create_router(state);

    tracing::info!(address = %addr, "Starting media server");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}
