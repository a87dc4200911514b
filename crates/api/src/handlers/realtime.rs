//! Realtime publishing helpers and the `ready` trigger.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use taskwatch_db::models::timeline::TimelinePostView;
use taskwatch_events::{EventBus, RealtimeEvent};

use crate::error::AppResult;
use crate::state::AppState;

/// POST /api/v1/realtime/ready
///
/// Broadcast a `ready` event to every connected client.
pub async fn announce_ready(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let receivers = state.event_bus.publish(RealtimeEvent::Ready);
    tracing::debug!(receivers, "Ready announced");
    Ok(StatusCode::NO_CONTENT)
}

/// Publish a created (`created = true`) or rewritten timeline post.
///
/// Viewer-specific fields are stripped first. The write this reports has
/// already committed, so a serialization failure is logged and dropped.
pub(crate) fn publish_post(bus: &EventBus, view: &TimelinePostView, created: bool) {
    let payload = view.for_broadcast();
    let event = if created {
        RealtimeEvent::posted(&payload)
    } else {
        RealtimeEvent::updated(&payload)
    };
    match event {
        Ok(event) => {
            bus.publish(event);
        }
        Err(e) => tracing::warn!(post_id = view.id, error = %e, "Failed to serialize post event"),
    }
}
