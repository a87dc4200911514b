//! Repository for the `occurrences` table.

use sqlx::PgPool;
use taskwatch_core::error::CoreError;
use taskwatch_core::occurrence::{
    check_transition, occurrence_not_found, OccurrenceChanges, OccurrenceDraft, StatusChange,
};
use taskwatch_core::pending::{invalid_cursor, PendingQuery};
use taskwatch_core::status::{OccurrenceStatus, TimelinePostKind};
use taskwatch_core::timeline::{auto_kind_for, auto_message};
use taskwatch_core::types::{DbId, Timestamp};

use crate::error::RepoError;
use crate::models::event::Event;
use crate::models::occurrence::{
    Occurrence, OccurrenceEventRow, OccurrenceWithEvent, PendingPage,
};
use crate::models::timeline::AutoPostUpsert;

/// Column list for `occurrences` queries.
pub(crate) const COLUMNS: &str = "id, event_id, user_id, start_at, end_at, status_id, \
    is_all_day, completed_at, notes, created_at, updated_at";

/// Occurrence columns qualified with `o.` plus the embedded event summary.
const JOINED_COLUMNS: &str = "o.id, o.event_id, o.user_id, o.start_at, o.end_at, o.status_id, \
    o.is_all_day, o.completed_at, o.notes, o.created_at, o.updated_at, \
    e.title AS event_title, e.rrule AS event_rrule, e.tag AS event_tag, \
    e.visibility_id AS event_visibility_id";

/// Result of a committed status change.
#[derive(Debug, Clone)]
pub struct StatusTransition {
    pub occurrence: OccurrenceWithEvent,
    pub timeline_kind: TimelinePostKind,
    pub post: AutoPostUpsert,
}

/// Provides lifecycle operations on individual occurrences.
pub struct OccurrenceRepo;

impl OccurrenceRepo {
    /// Add one occurrence to an existing event. The row starts SCHEDULED.
    pub async fn create(
        pool: &PgPool,
        event: &Event,
        draft: &OccurrenceDraft,
    ) -> Result<Occurrence, sqlx::Error> {
        let query = format!(
            "INSERT INTO occurrences (event_id, user_id, start_at, end_at, is_all_day, notes) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Occurrence>(&query)
            .bind(event.id)
            .bind(event.user_id)
            .bind(draft.start_at)
            .bind(draft.end_at)
            .bind(event.is_all_day)
            .bind(&draft.notes)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Occurrence>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM occurrences WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Occurrence>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_with_event(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<OccurrenceWithEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} FROM occurrences o \
             JOIN events e ON e.id = o.event_id \
             WHERE o.id = $1 AND o.user_id = $2"
        );
        let row = sqlx::query_as::<_, OccurrenceEventRow>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// The user's occurrences starting in `[start, end)`, by start time.
    pub async fn list_in_range(
        pool: &PgPool,
        user_id: DbId,
        start: Timestamp,
        end: Timestamp,
        status: Option<OccurrenceStatus>,
    ) -> Result<Vec<OccurrenceWithEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} FROM occurrences o \
             JOIN events e ON e.id = o.event_id \
             WHERE o.user_id = $1 AND o.start_at >= $2 AND o.start_at < $3 \
               AND ($4::SMALLINT IS NULL OR o.status_id = $4) \
             ORDER BY o.start_at, o.id"
        );
        let rows = sqlx::query_as::<_, OccurrenceEventRow>(&query)
            .bind(user_id)
            .bind(start)
            .bind(end)
            .bind(status.map(|s| s.id()))
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Reschedule and/or annotate. Returns `None` for foreign or absent rows.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
        changes: &OccurrenceChanges,
    ) -> Result<Option<Occurrence>, sqlx::Error> {
        let query = format!(
            "UPDATE occurrences SET \
                start_at = $3, \
                end_at = $4, \
                notes = CASE WHEN $5 THEN $6 ELSE notes END, \
                updated_at = now() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Occurrence>(&query)
            .bind(id)
            .bind(user_id)
            .bind(changes.start_at)
            .bind(changes.end_at)
            .bind(changes.notes.is_some())
            .bind(changes.notes.clone().flatten())
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM occurrences WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One page of SCHEDULED occurrences that ended before the cutoff,
    /// ordered by `(end_at, id)` and continuing strictly after the cursor row.
    ///
    /// Fetches one extra row so callers can tell whether another page exists.
    /// The cursor check, the total and the page share one snapshot, so
    /// `total` always agrees with the rows returned.
    pub async fn pending(
        pool: &PgPool,
        user_id: DbId,
        params: &PendingQuery,
    ) -> Result<PendingPage, RepoError> {
        let scheduled = OccurrenceStatus::Scheduled.id();

        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let cursor_end: Option<Timestamp> = match params.cursor_id {
            None => None,
            Some(cursor_id) => {
                let end: Option<Timestamp> = sqlx::query_scalar(
                    "SELECT end_at FROM occurrences \
                     WHERE id = $1 AND user_id = $2 AND status_id = $3 AND end_at < $4",
                )
                .bind(cursor_id)
                .bind(user_id)
                .bind(scheduled)
                .bind(params.cutoff)
                .fetch_optional(&mut *tx)
                .await?;
                Some(end.ok_or_else(invalid_cursor)?)
            }
        };

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM occurrences \
             WHERE user_id = $1 AND status_id = $2 AND end_at < $3",
        )
        .bind(user_id)
        .bind(scheduled)
        .bind(params.cutoff)
        .fetch_one(&mut *tx)
        .await?;

        let query = format!(
            "SELECT {JOINED_COLUMNS} FROM occurrences o \
             JOIN events e ON e.id = o.event_id \
             WHERE o.user_id = $1 AND o.status_id = $2 AND o.end_at < $3 \
               AND ($4::TIMESTAMPTZ IS NULL OR (o.end_at, o.id) > ($4, $5)) \
             ORDER BY o.end_at, o.id \
             LIMIT $6"
        );
        let rows = sqlx::query_as::<_, OccurrenceEventRow>(&query)
            .bind(user_id)
            .bind(scheduled)
            .bind(params.cutoff)
            .bind(cursor_end)
            .bind(params.cursor_id)
            .bind(params.limit + 1)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(PendingPage {
            items: rows.into_iter().map(Into::into).collect(),
            total,
        })
    }

    /// Move an occurrence to DONE or MISSED and upsert its auto timeline post.
    ///
    /// The row is locked for the duration of the transaction so concurrent
    /// transitions observe each other's result. The post keeps its memo;
    /// its kind and message follow the new status.
    pub async fn change_status(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
        change: &StatusChange,
    ) -> Result<StatusTransition, RepoError> {
        let mut tx = pool.begin().await?;

        let lock_query = format!(
            "SELECT {JOINED_COLUMNS} FROM occurrences o \
             JOIN events e ON e.id = o.event_id \
             WHERE o.id = $1 AND o.user_id = $2 \
             FOR UPDATE OF o"
        );
        let current = sqlx::query_as::<_, OccurrenceEventRow>(&lock_query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(occurrence_not_found)?;

        check_transition(current.occurrence.status, change.status)?;
        let kind = auto_kind_for(change.status)
            .ok_or_else(|| CoreError::Internal(format!("{} has no timeline kind", change.status)))?;
        let title = current.event_title.clone();

        let update_query = format!(
            "UPDATE occurrences SET \
                status_id = $2, \
                completed_at = $3, \
                notes = CASE WHEN $4 THEN $5 ELSE notes END, \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        let occurrence = sqlx::query_as::<_, Occurrence>(&update_query)
            .bind(id)
            .bind(change.status.id())
            .bind(change.completed_at)
            .bind(change.notes.is_some())
            .bind(change.notes.clone().flatten())
            .fetch_one(&mut *tx)
            .await?;

        let (post_id, created): (DbId, bool) = sqlx::query_as(
            "INSERT INTO timeline_posts (user_id, kind_id, occurrence_id, message) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (occurrence_id) DO UPDATE SET \
                kind_id = EXCLUDED.kind_id, \
                message = EXCLUDED.message, \
                updated_at = now() \
             RETURNING id, (xmax = 0) AS created",
        )
        .bind(user_id)
        .bind(kind.id())
        .bind(id)
        .bind(auto_message(kind, Some(&title)))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let row = OccurrenceEventRow {
            occurrence,
            ..current
        };
        Ok(StatusTransition {
            occurrence: row.into(),
            timeline_kind: kind,
            post: AutoPostUpsert { post_id, created },
        })
    }
}
