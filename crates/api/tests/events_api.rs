//! HTTP-level tests for events and occurrences.

mod common;

use assert_matches::assert_matches;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde_json::json;
use sqlx::PgPool;
use taskwatch_events::RealtimeEvent;
use tower::ServiceExt;

use common::{body_json, delete, get, patch_json, post_json, user_with_token};

/// Whole-second "now", so values survive the database round trip unchanged.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

fn event_body(title: &str, start: DateTime<Utc>, minutes: i64, rrule: Option<&str>) -> serde_json::Value {
    json!({
        "title": title,
        "duration_minutes": minutes,
        "rrule": rrule,
        "first_occurrence": {
            "start_at": iso(start),
            "end_at": iso(start + Duration::minutes(minutes)),
        },
    })
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_recurring_event_materializes_occurrences(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "Ann").await;
    let app = common::build_test_app(pool);
    let start = now() + Duration::days(1);

    let response = post_json(
        &app,
        "/api/v1/events",
        &token,
        event_body("Run", start, 30, Some("FREQ=WEEKLY")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let event = &json["data"]["event"];
    assert_eq!(event["title"], "Run");
    assert_eq!(event["visibility"], "PRIVATE");
    assert_eq!(event["occurrences"].as_array().unwrap().len(), 12);
    assert_eq!(event["occurrences"][0]["status"], "SCHEDULED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_event_reports_every_invalid_field(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "Ann").await;
    let app = common::build_test_app(pool);

    let response = post_json(
        &app,
        "/api/v1/events",
        &token,
        json!({ "title": "  ", "duration_minutes": 2, "tag": "x".repeat(40) }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["details"]["title"].is_string());
    assert!(json["details"]["duration_minutes"].is_string());
    assert!(json["details"]["tag"].is_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unsupported_frequency_is_invalid_rrule(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "Ann").await;
    let app = common::build_test_app(pool);
    let start = now() + Duration::days(1);

    let response = post_json(
        &app,
        "/api/v1/events",
        &token,
        event_body("Rent", start, 30, Some("FREQ=MONTHLY")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["code"], "INVALID_RRULE");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn malformed_body_is_invalid_json(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "Ann").await;
    let app = common::build_test_app(pool);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/events")
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_JSON");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_and_get_with_occurrence_window(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "Ann").await;
    let app = common::build_test_app(pool);
    let start = now() + Duration::hours(2);

    let created = body_json(
        post_json(
            &app,
            "/api/v1/events",
            &token,
            event_body("Read", start, 20, Some("FREQ=DAILY")),
        )
        .await,
    )
    .await;
    let id = created["data"]["event"]["id"].as_i64().unwrap();

    let plain = body_json(get(&app, "/api/v1/events", &token).await).await;
    let events = plain["data"]["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].get("occurrences").is_none());

    let range_start = iso(start - Duration::minutes(1));
    let uri = format!(
        "/api/v1/events/{id}?with_occurrences=true&range_start={}",
        urlencode(&range_start)
    );
    let windowed = body_json(get(&app, &uri, &token).await).await;
    let occurrences = windowed["data"]["event"]["occurrences"].as_array().unwrap();
    assert_eq!(occurrences.len(), 7);

    let bad = get(
        &app,
        &format!("/api/v1/events/{id}?with_occurrences=1&range_start=yesterday"),
        &token,
    )
    .await;
    assert_eq!(bad.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(bad).await["code"], "INVALID_RANGE");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_event_fields_and_reject_empty_body(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "Ann").await;
    let app = common::build_test_app(pool);
    let start = now() + Duration::days(1);

    let created = body_json(
        post_json(&app, "/api/v1/events", &token, event_body("Read", start, 20, Some("FREQ=DAILY"))).await,
    )
    .await;
    let id = created["data"]["event"]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/events/{id}");

    let empty = patch_json(&app, &uri, &token, json!({})).await;
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(empty).await["code"], "EMPTY_UPDATE");

    let updated = patch_json(
        &app,
        &uri,
        &token,
        json!({ "title": "Read more", "rrule": null, "tag": "books" }),
    )
    .await;
    assert_eq!(updated.status(), StatusCode::OK);
    let json = body_json(updated).await;
    assert_eq!(json["data"]["event"]["title"], "Read more");
    assert_eq!(json["data"]["event"]["rrule"], serde_json::Value::Null);
    assert_eq!(json["data"]["event"]["tag"], "books");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn foreign_and_deleted_events_are_not_found(pool: PgPool) {
    let (_, ann) = user_with_token(&pool, "Ann").await;
    let (_, bob) = user_with_token(&pool, "Bob").await;
    let app = common::build_test_app(pool);
    let start = now() + Duration::days(1);

    let created = body_json(post_json(&app, "/api/v1/events", &ann, event_body("Read", start, 20, None)).await).await;
    let id = created["data"]["event"]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/events/{id}");

    let foreign = get(&app, &uri, &bob).await;
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(foreign).await["code"], "EVENT_NOT_FOUND");

    assert_eq!(delete(&app, &uri, &bob).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(delete(&app, &uri, &ann).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(get(&app, &uri, &ann).await.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn add_single_occurrence_to_event(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "Ann").await;
    let app = common::build_test_app(pool);
    let start = now() + Duration::days(1);

    let created = body_json(post_json(&app, "/api/v1/events", &token, event_body("Read", start, 20, None)).await).await;
    let id = created["data"]["event"]["id"].as_i64().unwrap();

    let extra = start + Duration::days(3);
    let response = post_json(
        &app,
        &format!("/api/v1/events/{id}/occurrences"),
        &token,
        json!({
            "start_at": iso(extra),
            "end_at": iso(extra + Duration::minutes(20)),
            "notes": "  bring glasses ",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["occurrence"]["event_id"], id);
    assert_eq!(json["data"]["occurrence"]["notes"], "bring glasses");
}

// ---------------------------------------------------------------------------
// Occurrences
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn pending_lists_overdue_scheduled_work(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "Ann").await;
    let app = common::build_test_app(pool);
    let first = now() - Duration::days(4) - Duration::hours(3);

    post_json(&app, "/api/v1/events", &token, event_body("Stretch", first, 30, Some("FREQ=DAILY"))).await;

    let response = get(&app, "/api/v1/occurrences/pending", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["total"], 5);
    assert_eq!(data["has_more"], false);
    let items = data["occurrences"].as_array().unwrap();
    assert_eq!(items.len(), 5);
    assert_eq!(items[0]["event"]["title"], "Stretch");
    assert!(items[0]["overdue_minutes"].as_i64().unwrap() > items[4]["overdue_minutes"].as_i64().unwrap());

    let cutoff = data["cutoff"].as_str().unwrap().to_string();
    let second_id = items[1]["id"].as_i64().unwrap();
    let paged = body_json(
        get(
            &app,
            &format!(
                "/api/v1/occurrences/pending?limit=2&before={}&cursor_id={second_id}",
                urlencode(&cutoff)
            ),
            &token,
        )
        .await,
    )
    .await;
    assert_eq!(paged["data"]["occurrences"].as_array().unwrap().len(), 2);
    assert_eq!(paged["data"]["has_more"], true);
    assert_eq!(paged["data"]["occurrences"][0]["id"], items[2]["id"]);

    let bad = get(&app, "/api/v1/occurrences/pending?limit=zero", &token).await;
    assert_eq!(body_json(bad).await["code"], "INVALID_LIMIT");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn pending_pages_stay_on_the_echoed_cutoff(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "Ann").await;
    let app = common::build_test_app(pool);
    let first = now() - Duration::days(4) - Duration::hours(3);
    post_json(&app, "/api/v1/events", &token, event_body("Stretch", first, 30, Some("FREQ=DAILY"))).await;
    // Ends after the first page's cutoff but before the real clock.
    let late = now() - Duration::minutes(60);
    post_json(&app, "/api/v1/events", &token, event_body("Late", late, 30, None)).await;

    let cutoff = now() - Duration::hours(1) - Duration::minutes(15);
    let page = |before: String, cursor: Option<i64>| {
        let uri = match cursor {
            Some(id) => format!("/api/v1/occurrences/pending?limit=2&before={before}&cursor_id={id}"),
            None => format!("/api/v1/occurrences/pending?limit=2&before={before}"),
        };
        let app = app.clone();
        let token = token.clone();
        async move { body_json(get(&app, &uri, &token).await).await }
    };

    let first_page = page(urlencode(&iso(cutoff)), None).await;
    assert_eq!(first_page["data"]["total"], 5);
    assert_eq!(first_page["data"]["has_more"], true);
    let echoed = first_page["data"]["cutoff"].as_str().unwrap().to_string();

    let mut seen: Vec<i64> = first_page["data"]["occurrences"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_i64().unwrap())
        .collect();
    loop {
        let next = page(urlencode(&echoed), seen.last().copied()).await;
        assert_eq!(next["data"]["total"], 5);
        assert_eq!(next["data"]["cutoff"], echoed.as_str());
        for item in next["data"]["occurrences"].as_array().unwrap() {
            assert_eq!(item["event"]["title"], "Stretch");
            seen.push(item["id"].as_i64().unwrap());
        }
        if next["data"]["has_more"] == false {
            break;
        }
    }
    assert_eq!(seen.len(), 5);
    assert!(seen.windows(2).all(|w| w[0] != w[1]));

    let current = body_json(get(&app, "/api/v1/occurrences/pending", &token).await).await;
    assert_eq!(current["data"]["total"], 6);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn status_change_creates_one_auto_post_and_broadcasts(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "Ann").await;
    let (app, state) = common::build_test_app_with_state(pool);
    let start = now() - Duration::hours(3);

    let created = body_json(post_json(&app, "/api/v1/events", &token, event_body("Run", start, 30, None)).await).await;
    let occurrence_id = created["data"]["event"]["occurrences"][0]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/occurrences/{occurrence_id}/status");

    let mut events = state.event_bus.subscribe();

    let done = patch_json(
        &app,
        &uri,
        &token,
        json!({ "status": "DONE", "completed_at": iso(start + Duration::minutes(30)) }),
    )
    .await;
    assert_eq!(done.status(), StatusCode::OK);
    let json = body_json(done).await;
    assert_eq!(json["data"]["occurrence"]["status"], "DONE");
    assert_eq!(json["data"]["occurrence"]["event"]["title"], "Run");

    assert_matches!(
        events.try_recv().unwrap(),
        RealtimeEvent::OccurrenceStatusChanged { occurrence_id: id, .. } if id == occurrence_id
    );
    assert_matches!(events.try_recv().unwrap(), RealtimeEvent::TimelinePosted { .. });

    let again = patch_json(&app, &uri, &token, json!({ "status": "DONE", "completed_at": iso(start) })).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(again).await["code"], "STATUS_UNCHANGED");

    let missed = patch_json(&app, &uri, &token, json!({ "status": "MISSED" })).await;
    assert_eq!(missed.status(), StatusCode::OK);
    assert_matches!(events.try_recv().unwrap(), RealtimeEvent::OccurrenceStatusChanged { .. });
    assert_matches!(events.try_recv().unwrap(), RealtimeEvent::TimelineUpdated { .. });

    let feed = body_json(get(&app, "/api/v1/timeline", &token).await).await;
    let items = feed["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["kind"], "AUTO_MISSED");

    let invalid = patch_json(&app, &uri, &token, json!({ "status": "SCHEDULED" })).await;
    assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn ended_occurrences_cannot_be_deleted(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "Ann").await;
    let app = common::build_test_app(pool);

    let past = body_json(
        post_json(&app, "/api/v1/events", &token, event_body("Old", now() - Duration::days(1), 30, None)).await,
    )
    .await;
    let past_id = past["data"]["event"]["occurrences"][0]["id"].as_i64().unwrap();
    let response = delete(&app, &format!("/api/v1/occurrences/{past_id}"), &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "DELETE_NOT_ALLOWED");

    let future = body_json(
        post_json(&app, "/api/v1/events", &token, event_body("New", now() + Duration::days(1), 30, None)).await,
    )
    .await;
    let future_id = future["data"]["event"]["occurrences"][0]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/occurrences/{future_id}");
    assert_eq!(delete(&app, &uri, &token).await.status(), StatusCode::NO_CONTENT);

    let gone = get(&app, &uri, &token).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(gone).await["code"], "OCCURRENCE_NOT_FOUND");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reschedule_and_range_listing(pool: PgPool) {
    let (_, token) = user_with_token(&pool, "Ann").await;
    let app = common::build_test_app(pool);
    let start = now() + Duration::days(2);

    let created = body_json(post_json(&app, "/api/v1/events", &token, event_body("Swim", start, 45, None)).await).await;
    let id = created["data"]["event"]["occurrences"][0]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/occurrences/{id}");

    let empty = patch_json(&app, &uri, &token, json!({})).await;
    assert_eq!(body_json(empty).await["code"], "EMPTY_UPDATE");

    let inverted = patch_json(
        &app,
        &uri,
        &token,
        json!({ "start_at": iso(start + Duration::hours(1)) }),
    )
    .await;
    assert_eq!(inverted.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(inverted).await["code"], "INVALID_RANGE");

    let moved_to = start + Duration::hours(1);
    let moved = patch_json(
        &app,
        &uri,
        &token,
        json!({ "start_at": iso(moved_to), "end_at": iso(moved_to + Duration::minutes(45)) }),
    )
    .await;
    assert_eq!(moved.status(), StatusCode::OK);
    let json = body_json(moved).await;
    let end: DateTime<Utc> = json["data"]["occurrence"]["end_at"].as_str().unwrap().parse().unwrap();
    assert_eq!(end, moved_to + Duration::minutes(45));

    let range = format!(
        "/api/v1/occurrences?start={}&end={}&status=scheduled",
        urlencode(&iso(start)),
        urlencode(&iso(start + Duration::days(1)))
    );
    let listed = body_json(get(&app, &range, &token).await).await;
    assert_eq!(listed["data"]["occurrences"].as_array().unwrap().len(), 1);

    let missing = get(&app, "/api/v1/occurrences", &token).await;
    assert_eq!(missing.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(missing).await["code"], "MISSING_RANGE");

    let too_large = format!(
        "/api/v1/occurrences?start={}&end={}",
        urlencode(&iso(start)),
        urlencode(&iso(start + Duration::days(40)))
    );
    assert_eq!(body_json(get(&app, &too_large, &token).await).await["code"], "RANGE_TOO_LARGE");
}

/// Percent-encode the characters of an RFC 3339 timestamp that are not
/// query-safe.
fn urlencode(raw: &str) -> String {
    raw.replace('+', "%2B").replace(':', "%3A")
}
