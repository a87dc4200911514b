//! Handlers for event definitions and their occurrence windows.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use taskwatch_core::event::{
    event_not_found, resolve_window, validate_create, validate_update, CreateEventRequest,
    UpdateEventRequest,
};
use taskwatch_core::occurrence::{validate_new_occurrence, CreateOccurrenceRequest};
use taskwatch_core::types::{DbId, Timestamp};
use taskwatch_db::models::event::{Event, EventWithOccurrences};
use taskwatch_db::models::occurrence::Occurrence;
use taskwatch_db::repositories::{EventRepo, OccurrenceRepo};
use taskwatch_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthUser;
use crate::query::EventListParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/events
///
/// The caller's events. With `with_occurrences=true` each event carries the
/// occurrences starting inside `[range_start, range_end)`.
pub async fn list_events(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<EventListParams>,
) -> AppResult<impl IntoResponse> {
    let events = EventRepo::list_by_user(&state.pool, auth.user_id).await?;

    if !params.with_occurrences() {
        return Ok(Json(DataResponse {
            data: json!({ "events": events }),
        }));
    }

    let (start, end) = resolve_window(
        params.range_start.as_deref(),
        params.range_end.as_deref(),
        Utc::now(),
    )?;
    let events = attach_occurrences(&state.pool, events, start, end).await?;
    Ok(Json(DataResponse {
        data: json!({ "events": events }),
    }))
}

/// POST /api/v1/events
///
/// Create an event and materialize its occurrences atomically.
pub async fn create_event(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateEventRequest>,
) -> AppResult<impl IntoResponse> {
    let plan = validate_create(&input)?;
    let created = EventRepo::create(&state.pool, auth.user_id, &plan).await?;

    tracing::info!(
        user_id = auth.user_id,
        event_id = created.event.id,
        occurrences = created.occurrences.len(),
        "Event created"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: json!({ "event": created }),
        }),
    ))
}

/// GET /api/v1/events/{id}
pub async fn get_event(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<EventListParams>,
) -> AppResult<impl IntoResponse> {
    let event = find_owned(&state.pool, id, auth.user_id).await?;

    if !params.with_occurrences() {
        return Ok(Json(DataResponse {
            data: json!({ "event": event }),
        }));
    }

    let (start, end) = resolve_window(
        params.range_start.as_deref(),
        params.range_end.as_deref(),
        Utc::now(),
    )?;
    let mut events = attach_occurrences(&state.pool, vec![event], start, end).await?;
    let event = events.pop().ok_or_else(event_not_found)?;
    Ok(Json(DataResponse {
        data: json!({ "event": event }),
    }))
}

/// PATCH /api/v1/events/{id}
///
/// Partial update of event-level fields. Sending `rrule: null` turns a
/// recurring event into a one-off; existing occurrences are untouched.
pub async fn update_event(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    ApiJson(input): ApiJson<UpdateEventRequest>,
) -> AppResult<impl IntoResponse> {
    if input.is_empty() {
        return Err(AppError::empty_update());
    }
    let changes = validate_update(&input)?;

    let event = EventRepo::update(&state.pool, id, auth.user_id, &changes)
        .await?
        .ok_or_else(event_not_found)?;

    tracing::info!(user_id = auth.user_id, event_id = id, "Event updated");

    Ok(Json(DataResponse {
        data: json!({ "event": event }),
    }))
}

/// DELETE /api/v1/events/{id}
///
/// Removes the event together with all of its occurrences.
pub async fn delete_event(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let deleted = EventRepo::delete(&state.pool, id, auth.user_id).await?;
    if !deleted {
        return Err(event_not_found().into());
    }

    tracing::info!(user_id = auth.user_id, event_id = id, "Event deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/events/{id}/occurrences
///
/// Add a single occurrence to an existing event.
pub async fn add_occurrence(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    ApiJson(input): ApiJson<CreateOccurrenceRequest>,
) -> AppResult<impl IntoResponse> {
    let event = find_owned(&state.pool, id, auth.user_id).await?;
    let draft = validate_new_occurrence(&input, event.duration_minutes, event.is_all_day)?;

    let occurrence = OccurrenceRepo::create(&state.pool, &event, &draft).await?;

    tracing::info!(
        user_id = auth.user_id,
        event_id = id,
        occurrence_id = occurrence.id,
        "Occurrence added"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: json!({ "occurrence": occurrence }),
        }),
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_owned(pool: &DbPool, id: DbId, user_id: DbId) -> AppResult<Event> {
    EventRepo::find_by_id(pool, id, user_id)
        .await?
        .ok_or_else(|| event_not_found().into())
}

/// Pair each event with its occurrences inside the window, preserving the
/// event order.
async fn attach_occurrences(
    pool: &DbPool,
    events: Vec<Event>,
    start: Timestamp,
    end: Timestamp,
) -> AppResult<Vec<EventWithOccurrences>> {
    let ids: Vec<DbId> = events.iter().map(|e| e.id).collect();
    let occurrences = EventRepo::occurrences_in_window(pool, &ids, start, end).await?;

    let mut by_event: HashMap<DbId, Vec<Occurrence>> = HashMap::new();
    for occurrence in occurrences {
        by_event.entry(occurrence.event_id).or_default().push(occurrence);
    }

    Ok(events
        .into_iter()
        .map(|event| {
            let occurrences = by_event.remove(&event.id).unwrap_or_default();
            EventWithOccurrences { event, occurrences }
        })
        .collect())
}
