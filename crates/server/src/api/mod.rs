use crate::config::ServerConfig;
use crate::state::AppState;
use crate::websocket;
use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storybook_mcp::composition::WELL_KNOWN_RESOURCE_PATH;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

mod handlers;

/// Start the API server
pub async fn serve(addr: &str, config: ServerConfig) -> Result<()> {
    let state = AppState::new(config);

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("MCP endpoint listening on http://{}/mcp", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the API router
fn create_router(state: AppState) -> Router {
    Router::new()
        // Protocol routes
        .route("/mcp", any(handlers::mcp))
        .route(WELL_KNOWN_RESOURCE_PATH, get(handlers::protected_resource))
        // Host event channel
        .route("/channel", get(websocket::ws_handler))
        // API routes
        .route("/api/health", get(health_check))
        // Middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "storybook-mcp",
        "version": env!("CARGO_PKG_VERSION"),
        "hosts_connected": state.channel.peers(),
    }))
}

/// JSON body of every non-protocol error
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }
}

/// Handler failure, rendered as an `ErrorResponse` with the given status
pub struct ApiError {
    status: StatusCode,
    source: anyhow::Error,
}

impl ApiError {
    pub fn bad_request(source: impl Into<anyhow::Error>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            source: source.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "Request failed: {:#}", self.source);
        } else {
            tracing::debug!(status = %self.status, "Request rejected: {:#}", self.source);
        }

        let causes: Vec<String> = self.source.chain().skip(1).map(|e| e.to_string()).collect();
        let body = ErrorResponse {
            error: self.source.to_string(),
            details: (!causes.is_empty()).then(|| causes.join(": ")),
        };
        (self.status, Json(body)).into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            source: err.into(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
