use storybook_mcp_core::CoreError;
use thiserror::Error;

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;

/// Errors raised by the protocol layer and its upstream integrations
#[derive(Debug, Error)]
pub enum McpError {
    /// Missing or rejected bearer token. Surfaced as an HTTP 401.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The named tool does not exist or is hidden for this request
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// An upstream HTTP service answered with a non-success status
    #[error("{url} responded with status {status}")]
    Upstream { url: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}
