//! Handlers for the caller's profile and user search.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use taskwatch_core::error::CoreError;
use taskwatch_core::search::MAX_USER_SEARCH_RESULTS;
use taskwatch_core::users::{validate_search_query, UpdateProfileRequest};
use taskwatch_db::repositories::UserRepo;

use crate::error::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthUser;
use crate::query::SearchParams;
use crate::response::DataResponse;
use crate::state::AppState;

fn user_not_found() -> CoreError {
    CoreError::not_found("USER_NOT_FOUND", "User not found.")
}

/// GET /api/v1/me/profile
pub async fn get_profile(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(DataResponse {
        data: json!({ "user": user }),
    }))
}

/// PATCH /api/v1/me/profile
///
/// Update `name` and/or `avatar_color`. `avatar_color: null` clears the color.
pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<UpdateProfileRequest>,
) -> AppResult<impl IntoResponse> {
    let changes = input.validate()?;
    if changes.is_empty() {
        return Err(AppError::bad_request("NO_CHANGES", "No profile changes were provided."));
    }

    let user = UserRepo::update_profile(&state.pool, auth.user_id, &changes)
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(user_id = auth.user_id, "Profile updated");

    Ok(Json(DataResponse {
        data: json!({ "user": user }),
    }))
}

/// GET /api/v1/users/search?q=
///
/// Up to ten users other than the caller whose name or email contains `q`.
pub async fn search_users(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<impl IntoResponse> {
    let term = validate_search_query(params.q.as_deref())?;
    let results =
        UserRepo::search(&state.pool, auth.user_id, &term, MAX_USER_SEARCH_RESULTS).await?;
    Ok(Json(DataResponse {
        data: json!({ "results": results }),
    }))
}
