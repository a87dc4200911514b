//! Handlers for the social timeline: the friend-circle feed, manual notes,
//! memos on auto posts and reactions.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;

use taskwatch_core::search::{parse_limit, split_page, DEFAULT_TIMELINE_LIMIT, MAX_TIMELINE_LIMIT};
use taskwatch_core::status::ReactionType;
use taskwatch_core::timeline::{
    ensure_can_react, ensure_manual_delete, ensure_manual_edit, ensure_memo_edit, post_not_found,
    CreateManualPostRequest, ReactionRequest, ReactionSummary, UpdateManualPostRequest,
    UpdateMemoRequest,
};
use taskwatch_core::types::DbId;
use taskwatch_db::models::timeline::{TimelinePost, TimelinePostView};
use taskwatch_db::repositories::{FriendshipRepo, TimelineRepo};
use taskwatch_db::DbPool;
use taskwatch_events::RealtimeEvent;

use crate::error::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::handlers::realtime::publish_post;
use crate::middleware::auth::AuthUser;
use crate::query::FeedParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `GET /timeline`.
#[derive(Debug, Serialize)]
pub struct FeedPage {
    pub items: Vec<TimelinePostView>,
    pub next_cursor: Option<DbId>,
    pub has_more: bool,
}

/* --------------------------------------------------------------------------
   Feed and manual posts
   -------------------------------------------------------------------------- */

/// GET /api/v1/timeline
///
/// Posts by the caller and their friends, newest first.
pub async fn feed(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> AppResult<impl IntoResponse> {
    let limit = parse_limit(
        params.limit.as_deref(),
        DEFAULT_TIMELINE_LIMIT,
        MAX_TIMELINE_LIMIT,
    )?;
    let cursor = params.cursor()?;

    let authors = FriendshipRepo::circle_ids(&state.pool, auth.user_id).await?;
    let rows = TimelineRepo::feed(&state.pool, auth.user_id, &authors, cursor, limit + 1).await?;
    let (items, has_more) = split_page(rows, limit);
    let next_cursor = if has_more {
        items.last().map(|post| post.id)
    } else {
        None
    };

    Ok(Json(DataResponse {
        data: FeedPage {
            items,
            next_cursor,
            has_more,
        },
    }))
}

/// POST /api/v1/timeline
pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateManualPostRequest>,
) -> AppResult<impl IntoResponse> {
    let message = input.validate()?;

    let post = TimelineRepo::create_manual(&state.pool, auth.user_id, &message).await?;
    let view = load_view(&state.pool, post.id, auth.user_id).await?;

    tracing::info!(user_id = auth.user_id, post_id = post.id, "Manual post created");
    publish_post(&state.event_bus, &view, true);

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: json!({ "post": view }),
        }),
    ))
}

/// PATCH /api/v1/timeline/{id}
///
/// Edit the message of the caller's own manual note.
pub async fn update_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    ApiJson(input): ApiJson<UpdateManualPostRequest>,
) -> AppResult<impl IntoResponse> {
    let post = find_post(&state.pool, id).await?;
    ensure_manual_edit(post.user_id, post.kind, auth.user_id)?;
    let message = input.validate()?;

    TimelineRepo::update_message(&state.pool, id, &message)
        .await?
        .ok_or_else(post_not_found)?;
    let view = load_view(&state.pool, id, auth.user_id).await?;

    tracing::info!(user_id = auth.user_id, post_id = id, "Manual post updated");
    publish_post(&state.event_bus, &view, false);

    Ok(Json(DataResponse {
        data: json!({ "post": view }),
    }))
}

/// DELETE /api/v1/timeline/{id}
pub async fn delete_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let post = find_post(&state.pool, id).await?;
    ensure_manual_delete(post.user_id, post.kind, auth.user_id)?;

    if !TimelineRepo::delete(&state.pool, id).await? {
        return Err(post_not_found().into());
    }

    tracing::info!(user_id = auth.user_id, post_id = id, "Manual post deleted");
    state
        .event_bus
        .publish(RealtimeEvent::TimelineDeleted { post_id: id });

    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/v1/timeline/{id}/memo
///
/// Set or clear the memo on one of the caller's auto posts. A blank memo
/// clears it.
pub async fn update_memo(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    ApiJson(input): ApiJson<UpdateMemoRequest>,
) -> AppResult<impl IntoResponse> {
    let post = find_post(&state.pool, id).await?;
    ensure_memo_edit(post.user_id, post.kind, auth.user_id)?;
    if input.is_empty() {
        return Err(AppError::bad_request("NO_CHANGES", "memo must be provided."));
    }
    let memo = input.validate()?;

    TimelineRepo::update_memo(&state.pool, id, memo.as_deref())
        .await?
        .ok_or_else(post_not_found)?;
    let view = load_view(&state.pool, id, auth.user_id).await?;

    tracing::info!(
        user_id = auth.user_id,
        post_id = id,
        cleared = memo.is_none(),
        "Memo updated"
    );
    publish_post(&state.event_bus, &view, false);

    Ok(Json(DataResponse {
        data: json!({ "post": view }),
    }))
}

/* --------------------------------------------------------------------------
   Reactions
   -------------------------------------------------------------------------- */

/// POST /api/v1/timeline/{id}/reactions
///
/// Toggle a LIKE or BAD. Repeating the stored type removes it; the other
/// type replaces it.
pub async fn react(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    ApiJson(input): ApiJson<ReactionRequest>,
) -> AppResult<impl IntoResponse> {
    let requested = input.validate()?;
    let summary = apply_reaction(&state, id, auth.user_id, Some(requested)).await?;
    Ok(Json(DataResponse { data: summary }))
}

/// DELETE /api/v1/timeline/{id}/reactions
///
/// Remove the caller's reaction, if any.
pub async fn remove_reaction(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let summary = apply_reaction(&state, id, auth.user_id, None).await?;
    Ok(Json(DataResponse { data: summary }))
}

/* --------------------------------------------------------------------------
   Helpers
   -------------------------------------------------------------------------- */

async fn find_post(pool: &DbPool, id: DbId) -> AppResult<TimelinePost> {
    TimelineRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| post_not_found().into())
}

async fn load_view(pool: &DbPool, id: DbId, viewer_id: DbId) -> AppResult<TimelinePostView> {
    TimelineRepo::find_view(pool, id, viewer_id)
        .await?
        .ok_or_else(|| post_not_found().into())
}

async fn apply_reaction(
    state: &AppState,
    post_id: DbId,
    viewer_id: DbId,
    requested: Option<ReactionType>,
) -> AppResult<ReactionSummary> {
    let post = find_post(&state.pool, post_id).await?;
    let are_friends = post.user_id != viewer_id
        && FriendshipRepo::are_friends(&state.pool, post.user_id, viewer_id).await?;
    ensure_can_react(post.user_id, viewer_id, are_friends)?;

    let summary = TimelineRepo::react(&state.pool, post_id, viewer_id, requested).await?;

    tracing::info!(
        user_id = viewer_id,
        post_id,
        reaction = ?summary.viewer_reaction,
        "Reaction updated"
    );
    state.event_bus.publish(RealtimeEvent::TimelineReacted {
        post_id,
        reactions: summary.counts,
    });

    Ok(summary)
}
