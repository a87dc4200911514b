//! WebSocket infrastructure for realtime delivery.
//!
//! Provides connection management, heartbeat pings, and the HTTP upgrade
//! handler mounted at `/api/v1/realtime/ws`.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
