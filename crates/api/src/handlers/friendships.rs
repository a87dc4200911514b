//! Handlers for friendships and friend requests.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Map, Value};

use taskwatch_core::error::CoreError;
use taskwatch_core::friendship::{
    listed_statuses, RequestAction, RequestDirection, RespondRequest, SendRequest,
};
use taskwatch_core::types::DbId;
use taskwatch_db::models::friendship::{
    FriendRequestView, Friendship, FriendshipView, SendOutcome,
};
use taskwatch_db::repositories::{FriendshipRepo, UserRepo};
use taskwatch_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::middleware::auth::AuthUser;
use crate::query::RequestListParams;
use crate::response::DataResponse;
use crate::state::AppState;

/* --------------------------------------------------------------------------
   Friendships
   -------------------------------------------------------------------------- */

/// GET /api/v1/friendships
pub async fn list_friendships(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let friendships = FriendshipRepo::list_for_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse {
        data: json!({ "friendships": friendships }),
    }))
}

/// POST /api/v1/friendships
///
/// Send a friend request. If the target already asked the caller, their
/// request is accepted instead and the new friendship returned.
pub async fn send_request(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<SendRequest>,
) -> AppResult<impl IntoResponse> {
    let target = input.target(auth.user_id)?;

    let data = match FriendshipRepo::send_request(&state.pool, auth.user_id, target).await? {
        SendOutcome::Accepted {
            friendship,
            request,
        } => {
            tracing::info!(
                user_id = auth.user_id,
                friend_user_id = target,
                friendship_id = friendship.id,
                "Mutual friend request accepted"
            );
            let friendship = friendship_view(&state.pool, &friendship, auth.user_id).await?;
            let request = request_view(&state.pool, request.id).await?;
            json!({ "friendship": friendship, "request": request })
        }
        SendOutcome::Requested(request) => {
            tracing::info!(
                user_id = auth.user_id,
                friend_user_id = target,
                request_id = request.id,
                "Friend request sent"
            );
            let request = request_view(&state.pool, request.id).await?;
            json!({ "friend_request": request })
        }
    };

    Ok((StatusCode::CREATED, Json(DataResponse { data })))
}

/// DELETE /api/v1/friendships/{id}
///
/// Either member may end a friendship.
pub async fn delete_friendship(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !FriendshipRepo::delete(&state.pool, id, auth.user_id).await? {
        return Err(AppError::Core(CoreError::not_found(
            "FRIENDSHIP_NOT_FOUND",
            "Friendship not found.",
        )));
    }

    tracing::info!(user_id = auth.user_id, friendship_id = id, "Friendship deleted");

    Ok(StatusCode::NO_CONTENT)
}

/* --------------------------------------------------------------------------
   Friend requests
   -------------------------------------------------------------------------- */

/// GET /api/v1/friendships/requests
///
/// Pending requests, received and/or sent depending on `direction`.
/// `include_history=true` adds answered and cancelled requests.
pub async fn list_requests(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<RequestListParams>,
) -> AppResult<impl IntoResponse> {
    let direction = RequestDirection::parse(params.direction.as_deref());
    let statuses = listed_statuses(params.include_history());

    let mut requests = Map::new();
    if direction.includes_received() {
        let received =
            FriendshipRepo::list_requests(&state.pool, auth.user_id, true, statuses).await?;
        requests.insert("received".into(), json!(received));
    }
    if direction.includes_sent() {
        let sent = FriendshipRepo::list_requests(&state.pool, auth.user_id, false, statuses).await?;
        requests.insert("sent".into(), json!(sent));
    }

    Ok(Json(DataResponse {
        data: json!({ "requests": Value::Object(requests) }),
    }))
}

/// PATCH /api/v1/friendships/requests/{id}
///
/// The receiver may `accept` or `reject`; the requester may `cancel`.
pub async fn respond_to_request(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    ApiJson(input): ApiJson<RespondRequest>,
) -> AppResult<impl IntoResponse> {
    let action = RequestAction::parse(input.action.as_deref())?;

    let outcome = FriendshipRepo::respond(&state.pool, id, auth.user_id, action).await?;

    tracing::info!(
        user_id = auth.user_id,
        request_id = id,
        status = ?outcome.request.status,
        "Friend request answered"
    );

    let request = request_view(&state.pool, outcome.request.id).await?;
    let data = match outcome.friendship {
        Some(friendship) => {
            let friendship = friendship_view(&state.pool, &friendship, auth.user_id).await?;
            json!({ "request": request, "friendship": friendship })
        }
        None => json!({ "request": request }),
    };

    Ok(Json(DataResponse { data }))
}

/* --------------------------------------------------------------------------
   Helpers
   -------------------------------------------------------------------------- */

async fn request_view(pool: &DbPool, id: DbId) -> AppResult<FriendRequestView> {
    FriendshipRepo::find_request_view(pool, id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::not_found(
                "REQUEST_NOT_FOUND",
                "Friend request not found.",
            ))
        })
}

/// `friendship` as seen by `viewer_id`, with the other member attached.
async fn friendship_view(
    pool: &DbPool,
    friendship: &Friendship,
    viewer_id: DbId,
) -> AppResult<FriendshipView> {
    let friend_id = friendship.other(viewer_id);
    let friend_user = UserRepo::find_summaries(pool, &[friend_id])
        .await?
        .pop()
        .ok_or_else(|| CoreError::not_found("USER_NOT_FOUND", "Friend user was not found."))?;
    Ok(FriendshipView {
        id: friendship.id,
        friend_user,
        created_at: friendship.created_at,
    })
}
