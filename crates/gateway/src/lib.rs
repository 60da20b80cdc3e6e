//! Browser gateway for Stepwise.
//!
//! Serves the embedded chat UI and the `/v1` JSON API it talks to.
//! There is exactly one chat session per gateway; it sits behind a single
//! mutex that a query holds for its whole loop, so queries never overlap.
//!
//! Built on Axum.

pub mod api;
pub mod frontend;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use stepwise_agent::{AgentLoop, ChatSession};
use stepwise_config::AppConfig;
use tokio::sync::Mutex;
use tracing::info;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: Arc<AgentLoop>,
    pub session: Mutex<ChatSession>,
}

impl GatewayState {
    pub fn new(agent: Arc<AgentLoop>) -> Self {
        Self {
            agent,
            session: Mutex::new(ChatSession::new()),
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the full router: health, `/v1` API, and the embedded frontend.
///
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api::v1_router(state))
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = stepwise_providers::build_from_config(&config)?;
    let agent = Arc::new(AgentLoop::from_config(provider, &config));
    let state = Arc::new(GatewayState::new(agent));

    let app = build_router(state);

    info!(addr = %addr, model = %config.model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
