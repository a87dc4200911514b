//! Handler for the friend-circle leaderboard.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;

use taskwatch_core::ranking::{build_leaderboard, Metric, Participant, Period};
use taskwatch_db::repositories::{FriendshipRepo, StatsRepo, UserRepo};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::RankingParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/rankings
///
/// Rank the caller and their friends by `metric` over `period`.
pub async fn leaderboard(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<RankingParams>,
) -> AppResult<impl IntoResponse> {
    let metric = Metric::parse(params.metric.as_deref())?;
    let period = Period::parse(params.period.as_deref())?;
    let range = period.range(Utc::now());

    let circle = FriendshipRepo::circle_ids(&state.pool, auth.user_id).await?;
    let participants: Vec<Participant> = UserRepo::find_summaries(&state.pool, &circle)
        .await?
        .into_iter()
        .map(|user| Participant {
            id: user.id,
            name: user.name,
        })
        .collect();
    let samples = StatsRepo::range_samples(&state.pool, &circle, range.start, range.end).await?;

    let board = build_leaderboard(metric, period, range, participants, &samples);
    Ok(Json(DataResponse { data: board }))
}
