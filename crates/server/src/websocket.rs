// WebSocket bridge between the Storybook host and the in-process event channel

use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use storybook_mcp_core::channel::{BroadcastChannel, ChannelEvent, EventChannel, CHANNEL_CLOSED_EVENT};
use storybook_mcp_core::CoreError;
use tokio::sync::broadcast;

/// Event channel shared with connected Storybook hosts.
///
/// Emitting fails while no host is connected, since nobody could answer.
#[derive(Default)]
pub struct HostChannel {
    events: BroadcastChannel,
    peers: AtomicUsize,
}

impl HostChannel {
    /// Number of connected hosts
    pub fn peers(&self) -> usize {
        self.peers.load(Ordering::SeqCst)
    }

    fn connect(self: &Arc<Self>) -> PeerGuard {
        self.peers.fetch_add(1, Ordering::SeqCst);
        PeerGuard {
            channel: self.clone(),
        }
    }

    /// Publish an event received from a connected host
    fn publish(&self, event: ChannelEvent) {
        let _ = self.events.emit(event);
    }
}

impl EventChannel for HostChannel {
    fn emit(&self, event: ChannelEvent) -> storybook_mcp_core::Result<()> {
        if self.peers() == 0 {
            return Err(CoreError::ChannelUnavailable);
        }
        self.events.emit(event)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events.subscribe()
    }

    fn is_available(&self) -> bool {
        self.peers() > 0
    }
}

struct PeerGuard {
    channel: Arc<HostChannel>,
}

impl Drop for PeerGuard {
    fn drop(&mut self) {
        if self.channel.peers.fetch_sub(1, Ordering::SeqCst) == 1 {
            tracing::debug!("Last Storybook host left, closing pending waits");
            self.channel
                .publish(ChannelEvent::new(CHANNEL_CLOSED_EVENT, serde_json::Value::Null));
        }
    }
}

/// WebSocket handler for host connections
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let channel = state.channel.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, channel))
}

/// Pump events both ways until either side closes
async fn handle_socket(socket: WebSocket, channel: Arc<HostChannel>) {
    let peer_id = uuid::Uuid::new_v4().to_string();
    let _guard = channel.connect();
    tracing::info!(peer = %peer_id, peers = channel.peers(), "Storybook host connected");

    let (mut sender, mut receiver) = socket.split();
    let mut events = channel.subscribe();

    let outbound_peer = peer_id.clone();
    let mut outbound = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    // Never echo an event back to the peer that emitted it
                    if event.emitter.as_deref() == Some(outbound_peer.as_str())
                        || event.event_type == CHANNEL_CLOSED_EVENT
                    {
                        continue;
                    }
                    let Ok(text) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(peer = %outbound_peer, skipped, "Host connection lagging, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let inbound_channel = channel.clone();
    let inbound_peer = peer_id.clone();
    let mut inbound = tokio::spawn(async move {
        while let Some(message) = receiver.next().await {
            match message {
                Ok(Message::Text(text)) => match serde_json::from_str::<ChannelEvent>(&text) {
                    Ok(event) => {
                        tracing::debug!(peer = %inbound_peer, event = %event.event_type, "Received host event");
                        inbound_channel.publish(event.from_emitter(inbound_peer.clone()));
                    }
                    Err(e) => tracing::warn!(peer = %inbound_peer, "Ignoring malformed host event: {}", e),
                },
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    tracing::error!(peer = %inbound_peer, "WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut outbound => inbound.abort(),
        _ = &mut inbound => outbound.abort(),
    }

    tracing::info!(peer = %peer_id, "Storybook host disconnected");
}
