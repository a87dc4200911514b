//! Handler for the personal weekly report.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;

use taskwatch_core::stats::{parse_week_start, weekly_report};
use taskwatch_db::repositories::StatsRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::WeekParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/stats/mypage
///
/// Weekly totals, daily breakdown, streaks and level for the caller. The
/// week defaults to the one containing today (UTC).
pub async fn my_page(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<WeekParams>,
) -> AppResult<impl IntoResponse> {
    let now = Utc::now();
    let monday = parse_week_start(params.week_start.as_deref(), now.date_naive())?;

    let history = StatsRepo::history(&state.pool, auth.user_id).await?;
    let report = weekly_report(&history, monday, now, &state.config.stats);

    Ok(Json(DataResponse { data: report }))
}
