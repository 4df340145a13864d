//! HTTP gateway for localllm.
//!
//! Exposes an OpenAI-compatible chat-completions endpoint plus health and
//! info routes:
//!
//! - `GET  /`                     — static endpoint listing
//! - `GET  /health`               — liveness and whether a model is loaded
//! - `POST /v1/chat/completions`  — see [`api_v1`]
//!
//! Built on Axum for high performance async HTTP.

pub mod api_v1;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{Router, extract::State, http::HeaderValue, response::Json, routing::get};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use localllm_config::ServerConfig;
use localllm_core::CompletionRouter;

/// Shared application state for the gateway.
///
/// Immutable after startup; handlers only read from it.
pub struct GatewayState {
    pub router: CompletionRouter,
}

impl GatewayState {
    pub fn new(router: CompletionRouter) -> Self {
        Self { router }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the full router with transport layers applied.
///
/// Layers:
/// - CORS (any origin unless `cors_origins` is configured)
/// - Request body size limit
/// - HTTP trace logging
pub fn build_router(state: SharedState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(server.body_limit))
        .layer(cors_layer(&server.cors_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if allowed.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(allowed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server and serve until Ctrl-C / SIGTERM.
pub async fn start(
    server: ServerConfig,
    router: CompletionRouter,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = server.bind_addr();
    let model_loaded = router.model_loaded();
    let app = build_router(Arc::new(GatewayState::new(router)), &server);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, model_loaded, "Gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

/// Resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl-C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

// --- Handlers ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        model_loaded: state.router.model_loaded(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub endpoints: Endpoints,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Endpoints {
    pub health: String,
    pub chat: String,
}

async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: "LLM Server is running".into(),
        endpoints: Endpoints {
            health: "/health".into(),
            chat: "/v1/chat/completions".into(),
        },
    })
}
