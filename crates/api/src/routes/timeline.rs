//! Route definitions for the social timeline.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::timeline;
use crate::state::AppState;

/// Timeline routes mounted at `/timeline`.
///
/// ```text
/// GET    /                  -> feed
/// POST   /                  -> create_post
/// PATCH  /{id}              -> update_post
/// DELETE /{id}              -> delete_post
/// PATCH  /{id}/memo         -> update_memo
/// POST   /{id}/reactions    -> react
/// DELETE /{id}/reactions    -> remove_reaction
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(timeline::feed).post(timeline::create_post))
        .route(
            "/{id}",
            patch(timeline::update_post).delete(timeline::delete_post),
        )
        .route("/{id}/memo", patch(timeline::update_memo))
        .route(
            "/{id}/reactions",
            post(timeline::react).delete(timeline::remove_reaction),
        )
}
