//! Taskwatch realtime event bus.
//!
//! - [`EventBus`] is the in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`RealtimeEvent`] is the closed set of events pushed to WebSocket
//!   clients.

pub mod bus;

pub use bus::{EventBus, RealtimeEvent, DEFAULT_CAPACITY};
