// Host event channel abstraction (publish/subscribe, no request correlation)

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// Published when the last host leaves; waits on host answers end with it
pub const CHANNEL_CLOSED_EVENT: &str = "storybook-mcp/channel-closed";

/// An event travelling over the host channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
    /// Identifier of the peer that emitted the event, never serialized
    #[serde(skip)]
    pub emitter: Option<String>,
}

impl ChannelEvent {
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            emitter: None,
        }
    }

    pub fn from_emitter(mut self, emitter: impl Into<String>) -> Self {
        self.emitter = Some(emitter.into());
        self
    }
}

/// Publish/subscribe channel shared with the host application
pub trait EventChannel: Send + Sync {
    /// Publish an event to every subscriber
    fn emit(&self, event: ChannelEvent) -> Result<()>;

    /// Subscribe to all events emitted after this call.
    ///
    /// Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent>;

    /// Whether anyone is connected to answer emitted events
    fn is_available(&self) -> bool {
        true
    }
}

/// In-process channel backed by a tokio broadcast
pub struct BroadcastChannel {
    sender: broadcast::Sender<ChannelEvent>,
}

impl BroadcastChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastChannel {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventChannel for BroadcastChannel {
    fn emit(&self, event: ChannelEvent) -> Result<()> {
        let event_type = event.event_type.clone();
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::debug!(event = %event_type, receivers, "Emitted channel event");
                Ok(())
            }
            // Nobody listening is not an error for a broadcast channel
            Err(_) => {
                tracing::debug!(event = %event_type, "Channel event dropped, no subscribers");
                Ok(())
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.sender.subscribe()
    }
}

/// Decode an event payload into a typed value
pub fn decode_payload<T: serde::de::DeserializeOwned>(event: &ChannelEvent) -> Result<T> {
    serde_json::from_value(event.payload.clone()).map_err(CoreError::from)
}
