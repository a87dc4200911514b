//! Repository tests for events, occurrences and the status/timeline coupling.

mod common;

use assert_matches::assert_matches;
use chrono::Duration;
use sqlx::PgPool;
use taskwatch_core::error::CoreError;
use taskwatch_core::event::EventChanges;
use taskwatch_core::occurrence::{OccurrenceChanges, StatusChange};
use taskwatch_core::pending::PendingQuery;
use taskwatch_core::status::{OccurrenceStatus, TimelinePostKind};
use taskwatch_db::error::RepoError;
use taskwatch_db::repositories::{EventRepo, OccurrenceRepo, TimelineRepo};

use common::{at, new_event, new_user};

fn done_at(ts: chrono::DateTime<chrono::Utc>) -> StatusChange {
    StatusChange {
        status: OccurrenceStatus::Done,
        completed_at: Some(ts),
        notes: None,
    }
}

fn missed() -> StatusChange {
    StatusChange {
        status: OccurrenceStatus::Missed,
        completed_at: None,
        notes: None,
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_recurring_event_creates_series(pool: PgPool) {
    let user = new_user(&pool, "Ana").await;
    let created = new_event(
        &pool,
        user.id,
        "Run",
        at(2024, 4, 1, 9),
        30,
        Some("RRULE:FREQ=WEEKLY;BYDAY=MO"),
    )
    .await;

    assert_eq!(created.occurrences.len(), 12);
    assert_eq!(created.occurrences[0].start_at, at(2024, 4, 1, 9));
    assert_eq!(created.occurrences[11].start_at, at(2024, 6, 17, 9));
    assert!(created
        .occurrences
        .iter()
        .all(|o| o.status == OccurrenceStatus::Scheduled && o.user_id == user.id));
    assert!(created
        .occurrences
        .iter()
        .all(|o| o.end_at - o.start_at == Duration::minutes(30)));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_event_update_clears_nullable_fields(pool: PgPool) {
    let user = new_user(&pool, "Ana").await;
    let created = new_event(&pool, user.id, "Read", at(2024, 4, 1, 9), 30, Some("FREQ=DAILY")).await;

    let changes = EventChanges {
        title: Some("Read more".into()),
        rrule: Some(None),
        tag: Some(Some("books".into())),
        ..Default::default()
    };
    let updated = EventRepo::update(&pool, created.event.id, user.id, &changes)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.title, "Read more");
    assert_eq!(updated.rrule, None);
    assert_eq!(updated.tag.as_deref(), Some("books"));
    assert_eq!(updated.duration_minutes, 30);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_event_is_invisible_to_other_users(pool: PgPool) {
    let owner = new_user(&pool, "Ana").await;
    let other = new_user(&pool, "Bo").await;
    let created = new_event(&pool, owner.id, "Run", at(2024, 4, 1, 9), 30, None).await;

    assert!(EventRepo::find_by_id(&pool, created.event.id, other.id)
        .await
        .unwrap()
        .is_none());
    assert!(!EventRepo::delete(&pool, created.event.id, other.id).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_event_delete_cascades(pool: PgPool) {
    let user = new_user(&pool, "Ana").await;
    let created = new_event(&pool, user.id, "Run", at(2024, 4, 1, 9), 30, Some("FREQ=DAILY")).await;

    assert!(EventRepo::delete(&pool, created.event.id, user.id).await.unwrap());
    for occurrence in &created.occurrences {
        assert!(OccurrenceRepo::find_by_id(&pool, occurrence.id, user.id)
            .await
            .unwrap()
            .is_none());
    }
}

// ---------------------------------------------------------------------------
// Occurrences
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reschedule_and_clear_notes(pool: PgPool) {
    let user = new_user(&pool, "Ana").await;
    let created = new_event(&pool, user.id, "Run", at(2024, 4, 1, 9), 30, None).await;
    let id = created.occurrences[0].id;

    let changes = OccurrenceChanges {
        start_at: at(2024, 4, 1, 10),
        end_at: at(2024, 4, 1, 11),
        notes: Some(None),
    };
    let updated = OccurrenceRepo::update(&pool, id, user.id, &changes)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.start_at, at(2024, 4, 1, 10));
    assert_eq!(updated.notes, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_check_constraint_rejects_inverted_range(pool: PgPool) {
    let user = new_user(&pool, "Ana").await;
    let created = new_event(&pool, user.id, "Run", at(2024, 4, 1, 9), 30, None).await;

    let changes = OccurrenceChanges {
        start_at: at(2024, 4, 1, 10),
        end_at: at(2024, 4, 1, 9),
        notes: None,
    };
    let result = OccurrenceRepo::update(&pool, created.occurrences[0].id, user.id, &changes).await;
    assert!(result.is_err());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_status_flips_keep_single_timeline_post(pool: PgPool) {
    let user = new_user(&pool, "Ana").await;
    let created = new_event(&pool, user.id, "Run", at(2024, 4, 1, 9), 30, None).await;
    let id = created.occurrences[0].id;

    let first = OccurrenceRepo::change_status(&pool, id, user.id, &done_at(at(2024, 4, 1, 10)))
        .await
        .unwrap();
    assert!(first.post.created);
    assert_eq!(first.timeline_kind, TimelinePostKind::AutoDone);
    assert_eq!(first.occurrence.occurrence.completed_at, Some(at(2024, 4, 1, 10)));

    TimelineRepo::update_memo(&pool, first.post.post_id, Some("felt good"))
        .await
        .unwrap();

    let second = OccurrenceRepo::change_status(&pool, id, user.id, &missed())
        .await
        .unwrap();
    assert!(!second.post.created);
    assert_eq!(second.post.post_id, first.post.post_id);
    assert_eq!(second.occurrence.occurrence.completed_at, None);

    let third = OccurrenceRepo::change_status(&pool, id, user.id, &done_at(at(2024, 4, 1, 11)))
        .await
        .unwrap();
    assert_eq!(third.post.post_id, first.post.post_id);

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM timeline_posts WHERE occurrence_id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 1);

    let post = TimelineRepo::find_by_id(&pool, first.post.post_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(post.kind, TimelinePostKind::AutoDone);
    assert_eq!(post.message, "Completed \"Run\".");
    assert_eq!(post.memo.as_deref(), Some("felt good"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_same_status_is_conflict(pool: PgPool) {
    let user = new_user(&pool, "Ana").await;
    let created = new_event(&pool, user.id, "Run", at(2024, 4, 1, 9), 30, None).await;
    let id = created.occurrences[0].id;

    OccurrenceRepo::change_status(&pool, id, user.id, &missed())
        .await
        .unwrap();
    let again = OccurrenceRepo::change_status(&pool, id, user.id, &missed()).await;
    assert_matches!(
        again,
        Err(RepoError::Core(CoreError::Conflict { code: "STATUS_UNCHANGED", .. }))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_status_change_on_foreign_occurrence_is_not_found(pool: PgPool) {
    let owner = new_user(&pool, "Ana").await;
    let other = new_user(&pool, "Bo").await;
    let created = new_event(&pool, owner.id, "Run", at(2024, 4, 1, 9), 30, None).await;

    let result =
        OccurrenceRepo::change_status(&pool, created.occurrences[0].id, other.id, &missed()).await;
    assert_matches!(
        result,
        Err(RepoError::Core(CoreError::NotFound { code: "OCCURRENCE_NOT_FOUND", .. }))
    );
}

// ---------------------------------------------------------------------------
// Pending
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_pending_pages_by_end_then_id(pool: PgPool) {
    let user = new_user(&pool, "Ana").await;
    let created = new_event(&pool, user.id, "Run", at(2024, 4, 1, 9), 30, Some("FREQ=DAILY;INTERVAL=1")).await;
    // Mark one overdue occurrence so it drops out of the pending set.
    OccurrenceRepo::change_status(&pool, created.occurrences[1].id, user.id, &missed())
        .await
        .unwrap();

    let cutoff = at(2024, 4, 6, 0);
    let first_page = OccurrenceRepo::pending(
        &pool,
        user.id,
        &PendingQuery {
            cutoff,
            cursor_id: None,
            limit: 2,
        },
    )
    .await
    .unwrap();
    // 04-01..04-05 ended before the cutoff; 04-02 was marked missed.
    assert_eq!(first_page.total, 4);
    assert_eq!(first_page.items.len(), 3);
    assert_eq!(first_page.items[0].occurrence.id, created.occurrences[0].id);
    assert_eq!(first_page.items[1].occurrence.id, created.occurrences[2].id);
    assert_eq!(first_page.items[0].event.title, "Run");

    let second_page = OccurrenceRepo::pending(
        &pool,
        user.id,
        &PendingQuery {
            cutoff,
            cursor_id: Some(created.occurrences[2].id),
            limit: 2,
        },
    )
    .await
    .unwrap();
    let ids: Vec<_> = second_page.items.iter().map(|i| i.occurrence.id).collect();
    assert_eq!(ids, vec![created.occurrences[3].id, created.occurrences[4].id]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_pending_total_matches_page_during_status_changes(pool: PgPool) {
    let user = new_user(&pool, "Ana").await;
    let created = new_event(&pool, user.id, "Run", at(2024, 4, 1, 9), 30, Some("FREQ=DAILY")).await;
    let query = PendingQuery {
        cutoff: at(2024, 6, 1, 0),
        cursor_id: None,
        limit: 200,
    };

    let flipper = async {
        for round in 0..10 {
            for occurrence in &created.occurrences {
                let change = if round % 2 == 0 {
                    missed()
                } else {
                    done_at(occurrence.end_at)
                };
                OccurrenceRepo::change_status(&pool, occurrence.id, user.id, &change)
                    .await
                    .unwrap();
            }
        }
    };
    let reader = async {
        for _ in 0..50 {
            let page = OccurrenceRepo::pending(&pool, user.id, &query).await.unwrap();
            assert_eq!(page.total, page.items.len() as i64);
            tokio::task::yield_now().await;
        }
    };
    tokio::join!(flipper, reader);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_pending_rejects_cursor_outside_filter(pool: PgPool) {
    let user = new_user(&pool, "Ana").await;
    let created = new_event(&pool, user.id, "Run", at(2024, 4, 1, 9), 30, None).await;

    let result = OccurrenceRepo::pending(
        &pool,
        user.id,
        &PendingQuery {
            cutoff: at(2024, 3, 1, 0),
            cursor_id: Some(created.occurrences[0].id),
            limit: 10,
        },
    )
    .await;
    assert_matches!(
        result,
        Err(RepoError::Core(CoreError::NotFound { code: "INVALID_CURSOR", .. }))
    );
}
