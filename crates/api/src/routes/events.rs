//! Route definitions for events.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::events;
use crate::state::AppState;

/// Event routes mounted at `/events`.
///
/// ```text
/// GET    /                   -> list_events
/// POST   /                   -> create_event
/// GET    /{id}               -> get_event
/// PATCH  /{id}               -> update_event
/// DELETE /{id}               -> delete_event
/// POST   /{id}/occurrences   -> add_occurrence
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(events::list_events).post(events::create_event))
        .route(
            "/{id}",
            get(events::get_event)
                .patch(events::update_event)
                .delete(events::delete_event),
        )
        .route("/{id}/occurrences", post(events::add_occurrence))
}
