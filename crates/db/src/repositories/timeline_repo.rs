//! Repository for the `timeline_posts` and `reactions` tables.

use sqlx::{PgPool, Postgres, Transaction};
use taskwatch_core::error::CoreError;
use taskwatch_core::status::{ReactionType, TimelinePostKind};
use taskwatch_core::timeline::{toggle_reaction, ReactionChange, ReactionCounts, ReactionSummary};
use taskwatch_core::types::DbId;

use crate::error::RepoError;
use crate::models::timeline::{TimelineFeedRow, TimelinePost, TimelinePostView};

/// Column list for `timeline_posts` queries.
const COLUMNS: &str = "id, user_id, kind_id, occurrence_id, message, memo, memo_updated_at, \
    created_at, updated_at";

/// Feed projection. `$1` is always the viewer id.
fn feed_select() -> String {
    format!(
        "SELECT p.id, p.user_id, p.kind_id, p.occurrence_id, p.message, p.memo, \
                p.memo_updated_at, p.created_at, p.updated_at, \
                u.name AS author_name, u.avatar_color AS author_avatar_color, \
                o.status_id AS occ_status_id, o.start_at AS occ_start_at, \
                o.end_at AS occ_end_at, o.is_all_day AS occ_is_all_day, \
                e.id AS event_id, e.title AS event_title, \
                e.is_all_day AS event_is_all_day, e.tag AS event_tag, \
                (SELECT COUNT(*) FROM reactions r \
                   WHERE r.post_id = p.id AND r.type_id = {like}) AS likes, \
                (SELECT COUNT(*) FROM reactions r \
                   WHERE r.post_id = p.id AND r.type_id = {bad}) AS bads, \
                (SELECT r.type_id FROM reactions r \
                   WHERE r.post_id = p.id AND r.user_id = $1) AS viewer_reaction_id \
         FROM timeline_posts p \
         JOIN users u ON u.id = p.user_id \
         LEFT JOIN occurrences o ON o.id = p.occurrence_id \
         LEFT JOIN events e ON e.id = o.event_id",
        like = ReactionType::Like.id(),
        bad = ReactionType::Bad.id(),
    )
}

pub struct TimelineRepo;

impl TimelineRepo {
    // -----------------------------------------------------------------------
    // Feed
    // -----------------------------------------------------------------------

    /// Posts by `author_ids`, newest first, strictly older than `cursor`.
    ///
    /// The cursor must itself be a post by one of `author_ids`. Returns at
    /// most `fetch` rows; callers ask for one more than the page size.
    pub async fn feed(
        pool: &PgPool,
        viewer_id: DbId,
        author_ids: &[DbId],
        cursor: Option<DbId>,
        fetch: i64,
    ) -> Result<Vec<TimelinePostView>, RepoError> {
        if let Some(cursor) = cursor {
            let visible: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM timeline_posts WHERE id = $1 AND user_id = ANY($2))",
            )
            .bind(cursor)
            .bind(author_ids)
            .fetch_one(pool)
            .await?;
            if !visible {
                return Err(CoreError::not_found(
                    "INVALID_CURSOR",
                    "Cursor does not reference an accessible post.",
                )
                .into());
            }
        }

        let query = format!(
            "{} WHERE p.user_id = ANY($2) AND ($3::BIGINT IS NULL OR p.id < $3) \
             ORDER BY p.id DESC \
             LIMIT $4",
            feed_select()
        );
        let rows = sqlx::query_as::<_, TimelineFeedRow>(&query)
            .bind(viewer_id)
            .bind(author_ids)
            .bind(cursor)
            .bind(fetch)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(|row| row.into_view(viewer_id)).collect())
    }

    /// A single post as `viewer_id` sees it. No visibility check.
    pub async fn find_view(
        pool: &PgPool,
        id: DbId,
        viewer_id: DbId,
    ) -> Result<Option<TimelinePostView>, sqlx::Error> {
        let query = format!("{} WHERE p.id = $2", feed_select());
        let row = sqlx::query_as::<_, TimelineFeedRow>(&query)
            .bind(viewer_id)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(|row| row.into_view(viewer_id)))
    }

    // -----------------------------------------------------------------------
    // Posts
    // -----------------------------------------------------------------------

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<TimelinePost>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM timeline_posts WHERE id = $1");
        sqlx::query_as::<_, TimelinePost>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create_manual(
        pool: &PgPool,
        user_id: DbId,
        message: &str,
    ) -> Result<TimelinePost, sqlx::Error> {
        let query = format!(
            "INSERT INTO timeline_posts (user_id, kind_id, message) VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TimelinePost>(&query)
            .bind(user_id)
            .bind(TimelinePostKind::ManualNote.id())
            .bind(message)
            .fetch_one(pool)
            .await
    }

    pub async fn update_message(
        pool: &PgPool,
        id: DbId,
        message: &str,
    ) -> Result<Option<TimelinePost>, sqlx::Error> {
        let query = format!(
            "UPDATE timeline_posts SET message = $2, updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TimelinePost>(&query)
            .bind(id)
            .bind(message)
            .fetch_optional(pool)
            .await
    }

    /// Set or clear the memo. `memo_updated_at` tracks the memo's presence.
    pub async fn update_memo(
        pool: &PgPool,
        id: DbId,
        memo: Option<&str>,
    ) -> Result<Option<TimelinePost>, sqlx::Error> {
        let query = format!(
            "UPDATE timeline_posts SET \
                memo = $2, \
                memo_updated_at = CASE WHEN $2::TEXT IS NULL THEN NULL ELSE now() END, \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TimelinePost>(&query)
            .bind(id)
            .bind(memo)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM timeline_posts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Reactions
    // -----------------------------------------------------------------------

    /// React with `requested`, or remove the viewer's reaction when `None`.
    ///
    /// Reacting with the type already stored removes it; reacting with the
    /// other type replaces it. The recount runs in the same transaction.
    pub async fn react(
        pool: &PgPool,
        post_id: DbId,
        viewer_id: DbId,
        requested: Option<ReactionType>,
    ) -> Result<ReactionSummary, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let existing: Option<i16> = sqlx::query_scalar(
            "SELECT type_id FROM reactions WHERE post_id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(post_id)
        .bind(viewer_id)
        .fetch_optional(&mut *tx)
        .await?;
        let existing = existing.and_then(|id| ReactionType::try_from(id).ok());

        let change = match requested {
            Some(requested) => toggle_reaction(existing, requested),
            None => ReactionChange::Remove,
        };

        match change {
            ReactionChange::Remove => {
                sqlx::query("DELETE FROM reactions WHERE post_id = $1 AND user_id = $2")
                    .bind(post_id)
                    .bind(viewer_id)
                    .execute(&mut *tx)
                    .await?;
            }
            ReactionChange::Insert(kind) | ReactionChange::Replace(kind) => {
                sqlx::query(
                    "INSERT INTO reactions (post_id, user_id, type_id) VALUES ($1, $2, $3) \
                     ON CONFLICT ON CONSTRAINT uq_reactions_post_user \
                        DO UPDATE SET type_id = EXCLUDED.type_id, updated_at = now()",
                )
                .bind(post_id)
                .bind(viewer_id)
                .bind(kind.id())
                .execute(&mut *tx)
                .await?;
            }
        }

        let summary = Self::summary(&mut tx, post_id, viewer_id).await?;
        tx.commit().await?;
        Ok(summary)
    }

    async fn summary(
        tx: &mut Transaction<'_, Postgres>,
        post_id: DbId,
        viewer_id: DbId,
    ) -> Result<ReactionSummary, sqlx::Error> {
        let (likes, bads, viewer): (i64, i64, Option<i16>) = sqlx::query_as(
            "SELECT \
                COUNT(*) FILTER (WHERE type_id = $3), \
                COUNT(*) FILTER (WHERE type_id = $4), \
                MAX(type_id) FILTER (WHERE user_id = $2) \
             FROM reactions WHERE post_id = $1",
        )
        .bind(post_id)
        .bind(viewer_id)
        .bind(ReactionType::Like.id())
        .bind(ReactionType::Bad.id())
        .fetch_one(&mut **tx)
        .await?;

        Ok(ReactionSummary {
            counts: ReactionCounts { likes, bads },
            viewer_reaction: viewer.and_then(|id| ReactionType::try_from(id).ok()),
        })
    }
}
