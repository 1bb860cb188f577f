use super::{ApiError, ApiResult, ErrorResponse};
use crate::bridge;
use crate::state::AppState;
use crate::ui;
use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

/// Protocol endpoint: JSON-RPC over POST/GET, session termination over DELETE,
/// and a status page for browsers
pub async fn mcp(State(state): State<Arc<AppState>>, request: Request) -> ApiResult<Response> {
    let request = bridge::into_mcp_request(request).await.map_err(ApiError::bad_request)?;
    let runtime = state.runtime().await?;

    let ctx = runtime.context_for(&request);
    if request.method == Method::GET && request.accepts_html() {
        let endpoint = format!("{}/mcp", request.origin());
        return Ok(bridge::into_response(ui::status_page(&runtime, &ctx, &endpoint)));
    }

    Ok(bridge::into_response(runtime.server.handle(request, ctx).await))
}

/// OAuth protected resource metadata, when a composed source requires auth
pub async fn protected_resource(State(state): State<Arc<AppState>>, request: Request) -> ApiResult<Response> {
    let request = bridge::into_mcp_request(request).await.map_err(ApiError::bad_request)?;
    let runtime = state.runtime().await?;

    match runtime.auth.build_well_known(&request.origin()) {
        Some(document) => Ok(Json(document).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("No authorization is configured")),
        )
            .into_response()),
    }
}
