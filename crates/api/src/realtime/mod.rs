//! Realtime fan-out.
//!
//! The [`RealtimeRelay`] subscribes to the event bus and pushes each event
//! to every open WebSocket as a JSON text frame.

pub mod relay;

pub use relay::RealtimeRelay;
