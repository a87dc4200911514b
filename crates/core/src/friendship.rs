//! Friend request lifecycle and friendship pair rules.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::FriendRequestStatus;
use crate::types::DbId;

/// Canonical `(user_a_id, user_b_id)` ordering of a friendship pair.
pub fn canonical_pair(a: DbId, b: DbId) -> (DbId, DbId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestAction {
    Accept,
    Reject,
    Cancel,
}

impl RequestAction {
    pub fn parse(raw: Option<&str>) -> Result<Self, CoreError> {
        match raw {
            Some("accept") => Ok(Self::Accept),
            Some("reject") => Ok(Self::Reject),
            Some("cancel") => Ok(Self::Cancel),
            _ => Err(CoreError::invalid(
                "INVALID_ACTION",
                "action must be one of accept, reject, cancel.",
            )),
        }
    }

    /// Status a pending request ends in after this action.
    pub fn resulting_status(self) -> FriendRequestStatus {
        match self {
            Self::Accept => FriendRequestStatus::Accepted,
            Self::Reject => FriendRequestStatus::Rejected,
            Self::Cancel => FriendRequestStatus::Cancelled,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RespondRequest {
    pub action: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SendRequest {
    pub friend_user_id: Option<DbId>,
}

impl SendRequest {
    pub fn target(&self, viewer_id: DbId) -> Result<DbId, CoreError> {
        let Some(target) = self.friend_user_id else {
            return Err(CoreError::Validation(
                [("friend_user_id".to_string(), "friend_user_id is required.".to_string())].into(),
            ));
        };
        if target == viewer_id {
            return Err(CoreError::invalid(
                "INVALID_TARGET",
                "You cannot add yourself as a friend.",
            ));
        }
        Ok(target)
    }
}

/// Check that `viewer_id` may apply `action` to a request in `status`
/// between `requester_id` and `receiver_id`.
pub fn authorize_action(
    action: RequestAction,
    status: FriendRequestStatus,
    requester_id: DbId,
    receiver_id: DbId,
    viewer_id: DbId,
) -> Result<(), CoreError> {
    if status != FriendRequestStatus::Pending {
        return Err(CoreError::conflict(
            "REQUEST_NOT_PENDING",
            "Friend request is no longer pending.",
        ));
    }
    match action {
        RequestAction::Accept | RequestAction::Reject if receiver_id != viewer_id => {
            Err(CoreError::forbidden(
                "FORBIDDEN",
                "Only the receiver can respond to this request.",
            ))
        }
        RequestAction::Cancel if requester_id != viewer_id => Err(CoreError::forbidden(
            "FORBIDDEN",
            "Only the requester can cancel this request.",
        )),
        _ => Ok(()),
    }
}

/// Which request listings to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDirection {
    Received,
    Sent,
    Both,
}

impl RequestDirection {
    /// Unrecognised values list both directions.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("received") => Self::Received,
            Some("sent") => Self::Sent,
            _ => Self::Both,
        }
    }

    pub fn includes_received(self) -> bool {
        matches!(self, Self::Received | Self::Both)
    }

    pub fn includes_sent(self) -> bool {
        matches!(self, Self::Sent | Self::Both)
    }
}

/// Request statuses to list: pending only, or everything with history.
pub fn listed_statuses(include_history: bool) -> &'static [FriendRequestStatus] {
    if include_history {
        FriendRequestStatus::ALL
    } else {
        &[FriendRequestStatus::Pending]
    }
}
