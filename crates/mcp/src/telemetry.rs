// Usage telemetry emitted by the MCP server

use serde::Serialize;
use serde_json::Value;

/// A single telemetry event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryEvent {
    pub name: String,
    pub payload: Value,
}

impl TelemetryEvent {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Sink for telemetry events
#[async_trait::async_trait]
pub trait Telemetry: Send + Sync {
    async fn record(&self, event: TelemetryEvent);
}

/// Writes telemetry events to the tracing log
pub struct TracingTelemetry;

#[async_trait::async_trait]
impl Telemetry for TracingTelemetry {
    async fn record(&self, event: TelemetryEvent) {
        tracing::info!(
            target: "storybook_mcp::telemetry",
            event = %event.name,
            payload = %event.payload,
            "telemetry"
        );
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Collects events in memory for assertions
    #[derive(Default)]
    pub struct RecordingTelemetry {
        pub events: Mutex<Vec<TelemetryEvent>>,
    }

    #[async_trait::async_trait]
    impl Telemetry for RecordingTelemetry {
        async fn record(&self, event: TelemetryEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}
