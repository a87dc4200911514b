//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`RealtimeEvent`]s. It is
//! built once at startup and shared via `Arc<EventBus>`.

use serde::{Deserialize, Serialize};
use taskwatch_core::status::{OccurrenceStatus, TimelinePostKind};
use taskwatch_core::timeline::ReactionCounts;
use taskwatch_core::types::DbId;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// RealtimeEvent
// ---------------------------------------------------------------------------

/// A change pushed to connected clients.
///
/// Serialized as `{"type": "...", "payload": ...}`. `ready` carries a
/// `null` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum RealtimeEvent {
    #[serde(rename = "timeline.posted")]
    TimelinePosted { post: serde_json::Value },

    #[serde(rename = "timeline.updated")]
    TimelineUpdated { post: serde_json::Value },

    #[serde(rename = "timeline.deleted")]
    TimelineDeleted { post_id: DbId },

    #[serde(rename = "timeline.reacted")]
    TimelineReacted {
        post_id: DbId,
        reactions: ReactionCounts,
    },

    #[serde(rename = "occurrence.status_changed")]
    OccurrenceStatusChanged {
        occurrence_id: DbId,
        status: OccurrenceStatus,
        timeline_kind: TimelinePostKind,
    },

    #[serde(rename = "ready", with = "null_payload")]
    Ready,
}

impl RealtimeEvent {
    /// Wire name of the event, e.g. `"timeline.posted"`.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TimelinePosted { .. } => "timeline.posted",
            Self::TimelineUpdated { .. } => "timeline.updated",
            Self::TimelineDeleted { .. } => "timeline.deleted",
            Self::TimelineReacted { .. } => "timeline.reacted",
            Self::OccurrenceStatusChanged { .. } => "occurrence.status_changed",
            Self::Ready => "ready",
        }
    }

    /// Serialize a post view into a `timeline.posted` event.
    pub fn posted<T: Serialize>(post: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::TimelinePosted {
            post: serde_json::to_value(post)?,
        })
    }

    /// Serialize a post view into a `timeline.updated` event.
    pub fn updated<T: Serialize>(post: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::TimelineUpdated {
            post: serde_json::to_value(post)?,
        })
    }
}

/// Unit variant encoded with an explicit `null` payload.
mod null_payload {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_none()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<(), D::Error> {
        Option::<serde::de::IgnoredAny>::deserialize(deserializer).map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
pub const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use taskwatch_events::bus::{EventBus, RealtimeEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(RealtimeEvent::Ready);
/// ```
pub struct EventBus {
    sender: broadcast::Sender<RealtimeEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unconsumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to every current subscriber. Returns how many received it.
    ///
    /// With no subscribers the event is dropped.
    pub fn publish(&self, event: RealtimeEvent) -> usize {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::debug!(event_type, receivers, "Realtime event published");
                receivers
            }
            Err(_) => 0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::broadcast::error::RecvError;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let delivered = bus.publish(RealtimeEvent::TimelineDeleted { post_id: 9 });
        assert_eq!(delivered, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received, RealtimeEvent::TimelineDeleted { post_id: 9 });
    }

    #[tokio::test]
    async fn every_subscriber_gets_a_copy() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(RealtimeEvent::Ready);

        assert_eq!(rx1.recv().await.unwrap(), RealtimeEvent::Ready);
        assert_eq!(rx2.recv().await.unwrap(), RealtimeEvent::Ready);
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(RealtimeEvent::Ready), 0);
    }

    #[test]
    fn dropping_receiver_unsubscribes() {
        let bus = EventBus::default();
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn slow_subscriber_lags() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();

        for id in 1..=3 {
            bus.publish(RealtimeEvent::TimelineDeleted { post_id: id });
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(1))));
        assert_eq!(
            rx.recv().await.unwrap(),
            RealtimeEvent::TimelineDeleted { post_id: 2 }
        );
    }

    #[test]
    fn wire_format_uses_type_and_payload() {
        let event = RealtimeEvent::TimelineReacted {
            post_id: 4,
            reactions: ReactionCounts { likes: 2, bads: 1 },
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "timeline.reacted", "payload": {"post_id": 4, "reactions": {"likes": 2, "bads": 1}}})
        );

        let status = RealtimeEvent::OccurrenceStatusChanged {
            occurrence_id: 3,
            status: OccurrenceStatus::Done,
            timeline_kind: TimelinePostKind::AutoDone,
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({"type": "occurrence.status_changed", "payload": {
                "occurrence_id": 3, "status": "DONE", "timeline_kind": "AUTO_DONE"
            }})
        );
    }

    #[test]
    fn ready_has_null_payload() {
        let value = serde_json::to_value(RealtimeEvent::Ready).unwrap();
        assert_eq!(value, json!({"type": "ready", "payload": null}));

        let parsed: RealtimeEvent = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, RealtimeEvent::Ready);
        assert_eq!(parsed.event_type(), "ready");
    }

    #[test]
    fn posted_wraps_serialized_view() {
        let event = RealtimeEvent::posted(&json!({"id": 1, "message": "hi"})).unwrap();
        assert_eq!(event.event_type(), "timeline.posted");
        assert_matches::assert_matches!(event, RealtimeEvent::TimelinePosted { post } => {
            assert_eq!(post["message"], "hi");
        });
    }
}
