//! Route definitions for occurrences.

use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::occurrences;
use crate::state::AppState;

/// Occurrence routes mounted at `/occurrences`.
///
/// ```text
/// GET    /                -> list_occurrences
/// GET    /pending         -> list_pending
/// GET    /{id}            -> get_occurrence
/// PATCH  /{id}            -> update_occurrence
/// DELETE /{id}            -> delete_occurrence
/// PATCH  /{id}/status     -> change_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(occurrences::list_occurrences))
        .route("/pending", get(occurrences::list_pending))
        .route(
            "/{id}",
            get(occurrences::get_occurrence)
                .patch(occurrences::update_occurrence)
                .delete(occurrences::delete_occurrence),
        )
        .route("/{id}/status", patch(occurrences::change_status))
}
