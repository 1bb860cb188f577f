// Conversion between axum requests/responses and the MCP transport values

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use storybook_mcp::{McpHttpRequest, McpHttpResponse};

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Buffer an axum request into a standard request value
pub async fn into_mcp_request(request: Request) -> Result<McpHttpRequest> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .context("Failed to read request body")?;
    McpHttpRequest::from_parts(parts.method, &parts.uri, parts.headers, body)
        .context("Failed to reconstruct request URL")
}

/// Write a standard response value back as an axum response
pub fn into_response(response: McpHttpResponse) -> Response {
    let mut out = (response.status, Body::from(response.body)).into_response();
    out.headers_mut().extend(response.headers);
    out
}
