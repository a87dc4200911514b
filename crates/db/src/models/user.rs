//! User entity models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use taskwatch_core::types::{DbId, Timestamp};

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub name: String,
    pub email: Option<String>,
    pub avatar_color: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Public projection of a user embedded in other payloads.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct UserSummary {
    pub id: DbId,
    pub name: String,
    pub email: Option<String>,
    pub avatar_color: Option<String>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            avatar_color: user.avatar_color,
        }
    }
}

/// Insert DTO. Users are mirrored from the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: Option<String>,
    pub avatar_color: Option<String>,
}
