//! Handlers for individual occurrences: range listing, the pending-work
//! queue, reschedule, status changes and deletion.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use taskwatch_core::occurrence::{
    ensure_deletable, occurrence_not_found, parse_status_filter, resolve_listing_range,
    validate_update, StatusChangeRequest, UpdateOccurrenceRequest,
};
use taskwatch_core::pending::{overdue_minutes, PendingQuery};
use taskwatch_core::search::split_page;
use taskwatch_core::types::{DbId, Timestamp};
use taskwatch_db::models::occurrence::OccurrenceWithEvent;
use taskwatch_db::repositories::{OccurrenceRepo, TimelineRepo};
use taskwatch_events::RealtimeEvent;

use crate::error::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::handlers::realtime::publish_post;
use crate::middleware::auth::AuthUser;
use crate::query::{OccurrenceRangeParams, PendingParams};
use crate::response::DataResponse;
use crate::state::AppState;

/// One entry of the pending queue.
#[derive(Debug, Serialize)]
pub struct PendingItem {
    #[serde(flatten)]
    pub occurrence: OccurrenceWithEvent,
    pub overdue_minutes: i64,
}

/// Body of `GET /occurrences/pending`.
#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub occurrences: Vec<PendingItem>,
    pub total: i64,
    pub has_more: bool,
    /// Echo this as `before` on later pages.
    pub cutoff: Timestamp,
}

/// GET /api/v1/occurrences
///
/// Occurrences starting inside `[start, end)`, optionally filtered by status.
pub async fn list_occurrences(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<OccurrenceRangeParams>,
) -> AppResult<impl IntoResponse> {
    let (start, end) = resolve_listing_range(params.start.as_deref(), params.end.as_deref())?;
    let status = parse_status_filter(params.status.as_deref())?;

    let occurrences =
        OccurrenceRepo::list_in_range(&state.pool, auth.user_id, start, end, status).await?;

    Ok(Json(DataResponse {
        data: json!({ "occurrences": occurrences }),
    }))
}

/// GET /api/v1/occurrences/pending
///
/// Scheduled occurrences that ended before `before` (default: now), oldest
/// first, with cursor pagination by occurrence id.
pub async fn list_pending(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PendingParams>,
) -> AppResult<impl IntoResponse> {
    let query = PendingQuery::resolve(
        params.before.as_deref(),
        params.cursor_id.as_deref(),
        params.limit.as_deref(),
        Utc::now(),
    )?;

    let page = OccurrenceRepo::pending(&state.pool, auth.user_id, &query).await?;
    let (items, has_more) = split_page(page.items, query.limit);

    let occurrences = items
        .into_iter()
        .map(|occurrence| PendingItem {
            overdue_minutes: overdue_minutes(query.cutoff, occurrence.occurrence.end_at),
            occurrence,
        })
        .collect();

    Ok(Json(DataResponse {
        data: PendingResponse {
            occurrences,
            total: page.total,
            has_more,
            cutoff: query.cutoff,
        },
    }))
}

/// GET /api/v1/occurrences/{id}
pub async fn get_occurrence(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let occurrence = OccurrenceRepo::find_with_event(&state.pool, id, auth.user_id)
        .await?
        .ok_or_else(occurrence_not_found)?;
    Ok(Json(DataResponse {
        data: json!({ "occurrence": occurrence }),
    }))
}

/// PATCH /api/v1/occurrences/{id}
///
/// Reschedule a single instance or edit its notes. Omitted notes are kept;
/// `null` clears them.
pub async fn update_occurrence(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    ApiJson(input): ApiJson<UpdateOccurrenceRequest>,
) -> AppResult<impl IntoResponse> {
    if input.is_empty() {
        return Err(AppError::empty_update());
    }

    let current = OccurrenceRepo::find_by_id(&state.pool, id, auth.user_id)
        .await?
        .ok_or_else(occurrence_not_found)?;
    let changes = validate_update(&input, current.start_at, current.end_at)?;

    let occurrence = OccurrenceRepo::update(&state.pool, id, auth.user_id, &changes)
        .await?
        .ok_or_else(occurrence_not_found)?;

    tracing::info!(user_id = auth.user_id, occurrence_id = id, "Occurrence updated");

    Ok(Json(DataResponse {
        data: json!({ "occurrence": occurrence }),
    }))
}

/// PATCH /api/v1/occurrences/{id}/status
///
/// Mark an occurrence DONE or MISSED. The matching auto post is created or
/// rewritten in the same transaction, then both changes are broadcast.
pub async fn change_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    ApiJson(input): ApiJson<StatusChangeRequest>,
) -> AppResult<impl IntoResponse> {
    let change = input.validate()?;

    let transition = OccurrenceRepo::change_status(&state.pool, id, auth.user_id, &change).await?;

    tracing::info!(
        user_id = auth.user_id,
        occurrence_id = id,
        status = ?transition.occurrence.occurrence.status,
        post_id = transition.post.post_id,
        "Occurrence status changed"
    );

    state.event_bus.publish(RealtimeEvent::OccurrenceStatusChanged {
        occurrence_id: id,
        status: transition.occurrence.occurrence.status,
        timeline_kind: transition.timeline_kind,
    });
    if let Some(view) =
        TimelineRepo::find_view(&state.pool, transition.post.post_id, auth.user_id).await?
    {
        publish_post(&state.event_bus, &view, transition.post.created);
    }

    Ok(Json(DataResponse {
        data: json!({ "occurrence": transition.occurrence }),
    }))
}

/// DELETE /api/v1/occurrences/{id}
///
/// Only occurrences that have not ended yet may be deleted.
pub async fn delete_occurrence(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let occurrence = OccurrenceRepo::find_by_id(&state.pool, id, auth.user_id)
        .await?
        .ok_or_else(occurrence_not_found)?;
    ensure_deletable(occurrence.end_at, Utc::now())?;

    if !OccurrenceRepo::delete(&state.pool, id, auth.user_id).await? {
        return Err(occurrence_not_found().into());
    }

    tracing::info!(user_id = auth.user_id, occurrence_id = id, "Occurrence deleted");

    Ok(StatusCode::NO_CONTENT)
}
