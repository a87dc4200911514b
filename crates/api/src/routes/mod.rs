pub mod events;
pub mod friendships;
pub mod health;
pub mod occurrences;
pub mod realtime;
pub mod stats;
pub mod timeline;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /events                                 list, create
/// /events/{id}                            get, update, delete
/// /events/{id}/occurrences                add one occurrence (POST)
///
/// /occurrences                            range listing (GET)
/// /occurrences/pending                    overdue scheduled work (GET)
/// /occurrences/{id}                       get, reschedule, delete
/// /occurrences/{id}/status                mark DONE / MISSED (PATCH)
///
/// /stats/mypage                           weekly report (GET)
/// /rankings                               friend leaderboard (GET)
///
/// /timeline                               feed, create manual note
/// /timeline/{id}                          edit, delete manual note
/// /timeline/{id}/memo                     memo on auto post (PATCH)
/// /timeline/{id}/reactions                react, remove reaction
///
/// /friendships                            list, send request
/// /friendships/{id}                       unfriend (DELETE)
/// /friendships/requests                   list requests (GET)
/// /friendships/requests/{id}              accept / reject / cancel (PATCH)
///
/// /me/profile                             get, update
/// /users/search                           search (GET)
///
/// /realtime/ws                            WebSocket (public)
/// /realtime/ready                         broadcast ready (POST, public)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/events", events::router())
        .nest("/occurrences", occurrences::router())
        .nest("/stats", stats::router())
        .nest("/rankings", stats::rankings_router())
        .nest("/timeline", timeline::router())
        .nest("/friendships", friendships::router())
        .nest("/me", users::me_router())
        .nest("/users", users::router())
        .nest("/realtime", realtime::router())
}
