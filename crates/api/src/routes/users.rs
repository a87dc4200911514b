//! Route definitions for profiles and user lookup.
//!
//! Two routers are provided:
//! - `me_router()` for the caller's own profile, mounted at `/me`
//! - `router()` for user search, mounted at `/users`

use axum::routing::get;
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/me`.
///
/// ```text
/// GET    /profile           -> get_profile
/// PATCH  /profile           -> update_profile
/// ```
pub fn me_router() -> Router<AppState> {
    Router::new().route(
        "/profile",
        get(users::get_profile).patch(users::update_profile),
    )
}

/// Routes mounted at `/users`.
///
/// ```text
/// GET    /search            -> search_users
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/search", get(users::search_users))
}
