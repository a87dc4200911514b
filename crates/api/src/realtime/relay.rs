use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::broadcast;

use taskwatch_events::RealtimeEvent;

use crate::ws::WsManager;

/// Forwards bus events to WebSocket clients.
pub struct RealtimeRelay {
    ws_manager: Arc<WsManager>,
}

impl RealtimeRelay {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the relay loop.
    ///
    /// Exits when the channel is closed, i.e. the
    /// [`EventBus`](taskwatch_events::EventBus) has been dropped. A lagging
    /// relay skips the events it missed.
    pub async fn run(self, mut receiver: broadcast::Receiver<RealtimeEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.forward(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Realtime relay lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, realtime relay shutting down");
                    break;
                }
            }
        }
    }

    async fn forward(&self, event: &RealtimeEvent) {
        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    event_type = event.event_type(),
                    "Failed to encode realtime event"
                );
                return;
            }
        };
        let delivered = self.ws_manager.broadcast(Message::Text(frame.into())).await;
        tracing::debug!(event_type = event.event_type(), delivered, "Realtime event relayed");
    }
}
