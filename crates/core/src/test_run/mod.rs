// Test-run coordination: a single-flight queue in front of a correlated
// request/response exchange over the host event channel.

mod broker;
mod queue;
mod report;

pub use broker::TestRunBroker;
pub use queue::{TestRunQueue, TestRunTicket};
pub use report::{format_report, ReportOptions};

use crate::channel::EventChannel;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Event asking the host test runner to start a run
pub const TRIGGER_TEST_RUN_REQUEST: &str = "storybook/test/trigger-test-run-request";
/// Event carrying the host test runner's terminal answer
pub const TRIGGER_TEST_RUN_RESPONSE: &str = "storybook/test/trigger-test-run-response";
/// Actor tag identifying runs triggered through MCP
pub const MCP_ACTOR: &str = "storybook-mcp";

pub const STATUS_SUCCESS: &str = "status-value:success";
pub const STATUS_ERROR: &str = "status-value:error";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRunConfig {
    pub a11y: bool,
}

/// Payload of [`TRIGGER_TEST_RUN_REQUEST`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunRequest {
    pub request_id: String,
    pub actor: String,
    /// `None` runs every story
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_ids: Option<Vec<String>>,
    pub config: TestRunConfig,
}

/// Terminal status reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestRunStatus {
    Completed,
    Error,
    Cancelled,
    Unknown(String),
}

impl From<&str> for TestRunStatus {
    fn from(value: &str) -> Self {
        match value {
            "completed" => TestRunStatus::Completed,
            "error" => TestRunStatus::Error,
            "cancelled" => TestRunStatus::Cancelled,
            other => TestRunStatus::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestRunErrorInfo {
    #[serde(default)]
    pub message: String,
}

/// Payload of [`TRIGGER_TEST_RUN_RESPONSE`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunResponse {
    pub request_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TestRunResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TestRunErrorInfo>,
}

impl TestRunResponse {
    pub fn status(&self) -> TestRunStatus {
        TestRunStatus::from(self.status.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCount {
    #[serde(default)]
    pub success: u32,
    #[serde(default)]
    pub error: u32,
}

/// Per-story component test status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryTestStatus {
    pub story_id: String,
    #[serde(default)]
    pub type_id: Option<String>,
    pub value: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl StoryTestStatus {
    pub fn is_success(&self) -> bool {
        self.value == STATUS_SUCCESS
    }

    pub fn is_error(&self) -> bool {
        self.value == STATUS_ERROR
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct A11yNode {
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub failure_summary: Option<String>,
    #[serde(default)]
    pub target: Vec<serde_json::Value>,
}

/// One violated accessibility rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct A11yViolation {
    pub id: String,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub help_url: Option<String>,
    #[serde(default)]
    pub nodes: Vec<A11yNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct A11yReport {
    #[serde(default)]
    pub violations: Vec<A11yViolation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

/// Runtime error raised outside any single story
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnhandledError {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "VITEST_TEST_PATH", default)]
    pub test_path: Option<String>,
    #[serde(rename = "VITEST_TEST_NAME", default)]
    pub test_name: Option<String>,
    #[serde(default)]
    pub stack: Option<String>,
}

/// Result of a completed run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunResult {
    #[serde(default)]
    pub story_ids: Option<Vec<String>>,
    #[serde(default)]
    pub component_test_count: TestCount,
    #[serde(default)]
    pub component_test_statuses: Vec<StoryTestStatus>,
    #[serde(default)]
    pub a11y_reports: BTreeMap<String, Vec<A11yReport>>,
    #[serde(default)]
    pub unhandled_errors: Vec<UnhandledError>,
}

/// Serializes test runs and correlates each one with its host response
pub struct TestRunCoordinator {
    queue: TestRunQueue,
    timeout: Option<Duration>,
}

impl TestRunCoordinator {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            queue: TestRunQueue::new(),
            timeout,
        }
    }

    /// Number of calls waiting for or holding the run ticket
    pub fn pending(&self) -> usize {
        self.queue.pending()
    }

    /// Wait for this call's turn, then run the tests and wait for the
    /// terminal response. The turn is released on every exit path.
    pub async fn run(
        &self,
        channel: Arc<dyn EventChannel>,
        story_ids: Option<Vec<String>>,
        a11y: bool,
    ) -> Result<TestRunResult> {
        if !channel.is_available() {
            return Err(CoreError::ChannelUnavailable);
        }

        let ticket = self.queue.acquire().await;
        tracing::debug!(ticket = ticket.number(), "Acquired test run turn");
        if !channel.is_available() {
            return Err(CoreError::ChannelUnavailable);
        }

        let broker = TestRunBroker::new(channel, self.timeout);
        let outcome = broker.trigger(story_ids, a11y).await;

        drop(ticket);
        outcome
    }
}

impl Default for TestRunCoordinator {
    fn default() -> Self {
        Self::new(None)
    }
}
