use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the story and test-run machinery
#[derive(Debug, Error)]
pub enum CoreError {
    /// The host event channel is not connected
    #[error("Storybook event channel is not available")]
    ChannelUnavailable,

    /// The host finished the run with an error
    #[error("Test run failed: {0}")]
    TestRunFailed(String),

    /// The host cancelled the run
    #[error("Test run was cancelled")]
    TestRunCancelled,

    /// No terminal response arrived within the configured bound
    #[error("Test run did not finish within {0} seconds")]
    TestRunTimedOut(u64),

    /// The host answered with a response we could not interpret
    #[error("Unexpected test run response: {0}")]
    UnexpectedResponse(String),

    /// A manifest did not match the expected schema
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
