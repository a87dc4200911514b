use axum::routing::get;
use axum::Router;

use crate::handlers::{rankings, stats};
use crate::state::AppState;

/// Routes mounted at `/stats`.
///
/// ```text
/// GET    /mypage          -> my_page
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/mypage", get(stats::my_page))
}

/// Routes mounted at `/rankings`.
///
/// ```text
/// GET    /                -> leaderboard
/// ```
pub fn rankings_router() -> Router<AppState> {
    Router::new().route("/", get(rankings::leaderboard))
}
