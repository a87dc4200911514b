use axum::routing::{get, post};
use axum::Router;

use crate::handlers::realtime;
use crate::state::AppState;
use crate::ws;

/// Realtime routes mounted at `/realtime`. Neither requires a bearer header.
///
/// ```text
/// GET    /ws                -> ws_handler (WebSocket upgrade)
/// POST   /ready             -> announce_ready
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/ready", post(realtime::announce_ready))
}
