//! Route definitions for friendships and friend requests.

use axum::routing::{delete, get, patch};
use axum::Router;

use crate::handlers::friendships;
use crate::state::AppState;

/// Friendship routes mounted at `/friendships`.
///
/// ```text
/// GET    /                  -> list_friendships
/// POST   /                  -> send_request
/// DELETE /{id}              -> delete_friendship
/// GET    /requests          -> list_requests
/// PATCH  /requests/{id}     -> respond_to_request
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(friendships::list_friendships).post(friendships::send_request),
        )
        .route("/{id}", delete(friendships::delete_friendship))
        .route("/requests", get(friendships::list_requests))
        .route("/requests/{id}", patch(friendships::respond_to_request))
}
