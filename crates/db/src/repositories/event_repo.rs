//! Repository for the `events` table and the occurrences created with it.

use sqlx::{PgPool, Postgres, Transaction};
use taskwatch_core::event::{EventChanges, EventPlan};
use taskwatch_core::occurrence::OccurrenceDraft;
use taskwatch_core::types::{DbId, Timestamp};

use crate::models::event::{Event, EventWithOccurrences};
use crate::models::occurrence::Occurrence;
use crate::repositories::occurrence_repo::COLUMNS as OCCURRENCE_COLUMNS;

/// Column list for `events` queries.
const COLUMNS: &str = "id, user_id, title, description, tag, visibility_id, \
    duration_minutes, is_all_day, rrule, exdates, created_at, updated_at";

/// Provides CRUD operations for events.
pub struct EventRepo;

impl EventRepo {
    /// Insert an event and every occurrence of its plan in one transaction.
    ///
    /// Either the event and all of its occurrences exist afterwards, or none do.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        plan: &EventPlan,
    ) -> Result<EventWithOccurrences, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO events \
                (user_id, title, description, tag, visibility_id, duration_minutes, \
                 is_all_day, rrule, exdates) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        let fields = &plan.fields;
        let event = sqlx::query_as::<_, Event>(&query)
            .bind(user_id)
            .bind(&fields.title)
            .bind(&fields.description)
            .bind(&fields.tag)
            .bind(fields.visibility.id())
            .bind(fields.duration_minutes)
            .bind(fields.is_all_day)
            .bind(plan.rrule())
            .bind(&fields.exdates)
            .fetch_one(&mut *tx)
            .await?;

        let occurrences = Self::insert_occurrences(&mut tx, &event, &plan.occurrences()).await?;

        tx.commit().await?;
        Ok(EventWithOccurrences { event, occurrences })
    }

    async fn insert_occurrences(
        tx: &mut Transaction<'_, Postgres>,
        event: &Event,
        drafts: &[OccurrenceDraft],
    ) -> Result<Vec<Occurrence>, sqlx::Error> {
        let query = format!(
            "INSERT INTO occurrences (event_id, user_id, start_at, end_at, is_all_day, notes) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {OCCURRENCE_COLUMNS}"
        );
        let mut created = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let occurrence = sqlx::query_as::<_, Occurrence>(&query)
                .bind(event.id)
                .bind(event.user_id)
                .bind(draft.start_at)
                .bind(draft.end_at)
                .bind(event.is_all_day)
                .bind(&draft.notes)
                .fetch_one(&mut **tx)
                .await?;
            created.push(occurrence);
        }
        Ok(created)
    }

    /// Find an event owned by `user_id`.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Event>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM events WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// List the user's events, newest first.
    pub async fn list_by_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Event>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM events WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Occurrences of `event_ids` starting in `[start, end)`, by start time.
    pub async fn occurrences_in_window(
        pool: &PgPool,
        event_ids: &[DbId],
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<Occurrence>, sqlx::Error> {
        let query = format!(
            "SELECT {OCCURRENCE_COLUMNS} FROM occurrences \
             WHERE event_id = ANY($1) AND start_at >= $2 AND start_at < $3 \
             ORDER BY start_at, id"
        );
        sqlx::query_as::<_, Occurrence>(&query)
            .bind(event_ids)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await
    }

    /// Apply a validated partial update. Returns `None` if the event does not
    /// exist or belongs to someone else.
    ///
    /// Nullable columns use a `(set, value)` pair so an explicit null clears
    /// the column while an absent field leaves it untouched.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
        changes: &EventChanges,
    ) -> Result<Option<Event>, sqlx::Error> {
        let query = format!(
            "UPDATE events SET \
                title = COALESCE($3, title), \
                description = CASE WHEN $4 THEN $5 ELSE description END, \
                tag = CASE WHEN $6 THEN $7 ELSE tag END, \
                visibility_id = COALESCE($8, visibility_id), \
                duration_minutes = COALESCE($9, duration_minutes), \
                is_all_day = COALESCE($10, is_all_day), \
                rrule = CASE WHEN $11 THEN $12 ELSE rrule END, \
                exdates = COALESCE($13, exdates), \
                updated_at = now() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .bind(user_id)
            .bind(&changes.title)
            .bind(changes.description.is_some())
            .bind(changes.description.clone().flatten())
            .bind(changes.tag.is_some())
            .bind(changes.tag.clone().flatten())
            .bind(changes.visibility.map(|v| v.id()))
            .bind(changes.duration_minutes)
            .bind(changes.is_all_day)
            .bind(changes.rrule.is_some())
            .bind(changes.rrule.clone().flatten())
            .bind(&changes.exdates)
            .fetch_optional(pool)
            .await
    }

    /// Delete an event and, by cascade, all of its occurrences.
    pub async fn delete(pool: &PgPool, id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
