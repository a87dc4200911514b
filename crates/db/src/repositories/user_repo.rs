//! Repository for the `users` table.

use sqlx::PgPool;
use taskwatch_core::types::DbId;
use taskwatch_core::users::ProfileChanges;

use crate::models::user::{CreateUser, User, UserSummary};

/// Column list for `users` queries.
const COLUMNS: &str = "id, name, email, avatar_color, created_at, updated_at";

/// Column list for the public projection.
const SUMMARY_COLUMNS: &str = "id, name, email, avatar_color";

pub struct UserRepo;

impl UserRepo {
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (name, email, avatar_color) VALUES ($1, $2, $3) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.avatar_color)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Summaries for `ids`, returned in the order of `ids`. Unknown ids are skipped.
    pub async fn find_summaries(
        pool: &PgPool,
        ids: &[DbId],
    ) -> Result<Vec<UserSummary>, sqlx::Error> {
        sqlx::query_as::<_, UserSummary>(
            "SELECT u.id, u.name, u.email, u.avatar_color \
             FROM unnest($1::BIGINT[]) WITH ORDINALITY AS ids(id, ord) \
             JOIN users u ON u.id = ids.id \
             ORDER BY ids.ord",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// Apply a validated profile update. Returns `None` if the user is gone.
    pub async fn update_profile(
        pool: &PgPool,
        id: DbId,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, sqlx::Error> {
        let (set_color, color) = match &changes.avatar_color {
            Some(color) => (true, color.clone()),
            None => (false, None),
        };
        let query = format!(
            "UPDATE users SET \
                name = COALESCE($2, name), \
                avatar_color = CASE WHEN $3 THEN $4 ELSE avatar_color END, \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&changes.name)
            .bind(set_color)
            .bind(color)
            .fetch_optional(pool)
            .await
    }

    /// Case-insensitive name/email substring search excluding `viewer_id`.
    pub async fn search(
        pool: &PgPool,
        viewer_id: DbId,
        term: &str,
        limit: i64,
    ) -> Result<Vec<UserSummary>, sqlx::Error> {
        let pattern = format!("%{}%", escape_like(term));
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM users \
             WHERE id <> $1 AND (name ILIKE $2 OR email ILIKE $2) \
             ORDER BY name, id \
             LIMIT $3"
        );
        sqlx::query_as::<_, UserSummary>(&query)
            .bind(viewer_id)
            .bind(pattern)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
