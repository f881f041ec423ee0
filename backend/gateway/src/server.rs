//! Main HTTP Gateway Server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use ledgerforge_agent::ChatOrchestrator;

use crate::auth::ApiKeyAuthenticator;
use crate::{chat_api, health_api};

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub authenticator: Arc<ApiKeyAuthenticator>,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(orchestrator: Arc<ChatOrchestrator>, authenticator: Arc<ApiKeyAuthenticator>) -> Self {
        Self {
            orchestrator,
            authenticator,
            started_at: Instant::now(),
        }
    }
}

impl FromRef<GatewayState> for Arc<ApiKeyAuthenticator> {
    fn from_ref(state: &GatewayState) -> Self {
        state.authenticator.clone()
    }
}

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/api/chat", post(chat_api::chat))
        .route("/api/tools", get(chat_api::list_tools))
        .route("/api/health", get(health_api::get_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl-C.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let app = build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Gateway HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
