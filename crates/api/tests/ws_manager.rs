//! Unit tests for `WsManager` and the realtime relay.
//!
//! No HTTP upgrades are performed; connections are registered directly.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use taskwatch_api::realtime::RealtimeRelay;
use taskwatch_api::ws::WsManager;
use taskwatch_events::{EventBus, RealtimeEvent};

#[tokio::test]
async fn new_manager_has_zero_connections() {
    let manager = WsManager::new();

    assert_eq!(manager.connection_count().await, 0);
}

#[tokio::test]
async fn add_and_remove_track_connection_count() {
    let manager = WsManager::new();

    let _rx1 = manager.add("conn-1".to_string(), None).await;
    let _rx2 = manager.add("conn-2".to_string(), Some(7)).await;
    assert_eq!(manager.connection_count().await, 2);
    assert_eq!(manager.authenticated_count().await, 1);

    manager.remove("conn-1").await;
    manager.remove("nonexistent").await;
    assert_eq!(manager.connection_count().await, 1);
}

#[tokio::test]
async fn broadcast_reaches_every_open_connection() {
    let manager = WsManager::new();

    let mut rx1 = manager.add("conn-1".to_string(), None).await;
    let mut rx2 = manager.add("conn-2".to_string(), None).await;
    let rx3 = manager.add("conn-3".to_string(), None).await;
    drop(rx3);

    let delivered = manager.broadcast(Message::Text("hello".into())).await;
    assert_eq!(delivered, 2);

    assert!(matches!(rx1.recv().await, Some(Message::Text(t)) if t.as_str() == "hello"));
    assert!(matches!(rx2.recv().await, Some(Message::Text(t)) if t.as_str() == "hello"));
}

#[tokio::test]
async fn ping_all_sends_ping_frames() {
    let manager = WsManager::new();
    let mut rx = manager.add("conn-1".to_string(), None).await;

    manager.ping_all().await;

    assert!(matches!(rx.recv().await, Some(Message::Ping(_))));
}

#[tokio::test]
async fn shutdown_all_sends_close_and_clears() {
    let manager = WsManager::new();
    let mut rx = manager.add("conn-1".to_string(), None).await;

    manager.shutdown_all().await;

    assert_eq!(manager.connection_count().await, 0);
    assert!(matches!(rx.recv().await, Some(Message::Close(None))));
}

#[tokio::test]
async fn relay_forwards_bus_events_as_json_text() {
    let manager = Arc::new(WsManager::new());
    let mut rx = manager.add("conn-1".to_string(), None).await;

    let bus = EventBus::default();
    let relay = RealtimeRelay::new(Arc::clone(&manager));
    let handle = tokio::spawn(relay.run(bus.subscribe()));

    bus.publish(RealtimeEvent::TimelineDeleted { post_id: 42 });

    let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("relay did not forward in time")
        .expect("channel closed");
    let Message::Text(text) = frame else {
        panic!("expected a text frame");
    };
    let json: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(json["type"], "timeline.deleted");
    assert_eq!(json["payload"]["post_id"], 42);

    drop(bus);
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("relay did not stop after the bus closed")
        .unwrap();
}
