//! Friend request and friendship models.

use serde::Serialize;
use sqlx::FromRow;
use taskwatch_core::status::FriendRequestStatus;
use taskwatch_core::types::{DbId, Timestamp};

use crate::models::user::UserSummary;

/// A row from the `friend_requests` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FriendRequest {
    pub id: DbId,
    pub requester_id: DbId,
    pub receiver_id: DbId,
    #[sqlx(rename = "status_id", try_from = "i16")]
    pub status: FriendRequestStatus,
    pub created_at: Timestamp,
    pub responded_at: Option<Timestamp>,
}

/// A row from the `friendships` table. `user_a_id < user_b_id` always holds.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Friendship {
    pub id: DbId,
    pub user_a_id: DbId,
    pub user_b_id: DbId,
    pub created_at: Timestamp,
}

impl Friendship {
    /// The member of the pair that is not `viewer_id`.
    pub fn other(&self, viewer_id: DbId) -> DbId {
        if self.user_a_id == viewer_id {
            self.user_b_id
        } else {
            self.user_a_id
        }
    }
}

/// A friendship from one member's point of view.
#[derive(Debug, Clone, Serialize)]
pub struct FriendshipView {
    pub id: DbId,
    pub friend_user: UserSummary,
    pub created_at: Timestamp,
}

/// Joined row behind [`FriendshipView`].
#[derive(Debug, Clone, FromRow)]
pub struct FriendshipViewRow {
    pub id: DbId,
    pub created_at: Timestamp,
    pub friend_id: DbId,
    pub friend_name: String,
    pub friend_email: Option<String>,
    pub friend_avatar_color: Option<String>,
}

impl From<FriendshipViewRow> for FriendshipView {
    fn from(row: FriendshipViewRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            friend_user: UserSummary {
                id: row.friend_id,
                name: row.friend_name,
                email: row.friend_email,
                avatar_color: row.friend_avatar_color,
            },
        }
    }
}

/// A friend request with the counterpart user attached.
#[derive(Debug, Clone, Serialize)]
pub struct FriendRequestView {
    #[serde(flatten)]
    pub request: FriendRequest,
    pub requester: UserSummary,
    pub receiver: UserSummary,
}

/// Joined row behind [`FriendRequestView`].
#[derive(Debug, Clone, FromRow)]
pub struct FriendRequestViewRow {
    #[sqlx(flatten)]
    pub request: FriendRequest,
    pub requester_name: String,
    pub requester_email: Option<String>,
    pub requester_avatar_color: Option<String>,
    pub receiver_name: String,
    pub receiver_email: Option<String>,
    pub receiver_avatar_color: Option<String>,
}

impl From<FriendRequestViewRow> for FriendRequestView {
    fn from(row: FriendRequestViewRow) -> Self {
        Self {
            requester: UserSummary {
                id: row.request.requester_id,
                name: row.requester_name,
                email: row.requester_email,
                avatar_color: row.requester_avatar_color,
            },
            receiver: UserSummary {
                id: row.request.receiver_id,
                name: row.receiver_name,
                email: row.receiver_email,
                avatar_color: row.receiver_avatar_color,
            },
            request: row.request,
        }
    }
}

/// Outcome of `POST /friendships`.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// The target had already asked; their request was accepted.
    Accepted {
        friendship: Friendship,
        request: FriendRequest,
    },
    /// A new pending request was created.
    Requested(FriendRequest),
}

/// Outcome of responding to a pending request.
#[derive(Debug, Clone)]
pub struct RespondOutcome {
    pub request: FriendRequest,
    pub friendship: Option<Friendship>,
}
