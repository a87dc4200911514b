//! Shared fixtures for repository tests.

#![allow(dead_code)]

use chrono::{Duration, TimeZone, Utc};
use sqlx::PgPool;
use taskwatch_core::event::{validate_create, CreateEventRequest, FirstOccurrenceRequest};
use taskwatch_core::types::{DbId, Timestamp};
use taskwatch_db::models::event::EventWithOccurrences;
use taskwatch_db::models::user::{CreateUser, User};
use taskwatch_db::repositories::{EventRepo, UserRepo};

pub fn at(y: i32, m: u32, d: u32, h: u32) -> Timestamp {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub async fn new_user(pool: &PgPool, name: &str) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            avatar_color: None,
        },
    )
    .await
    .unwrap()
}

pub fn event_request(title: &str, start: Timestamp, minutes: i64, rrule: Option<&str>) -> CreateEventRequest {
    CreateEventRequest {
        title: Some(title.to_string()),
        duration_minutes: Some(minutes as f64),
        rrule: rrule.map(str::to_string),
        first_occurrence: Some(FirstOccurrenceRequest {
            start_at: start,
            end_at: start + Duration::minutes(minutes),
            notes: None,
        }),
        ..Default::default()
    }
}

pub async fn new_event(
    pool: &PgPool,
    user_id: DbId,
    title: &str,
    start: Timestamp,
    minutes: i64,
    rrule: Option<&str>,
) -> EventWithOccurrences {
    let plan = validate_create(&event_request(title, start, minutes, rrule)).unwrap();
    EventRepo::create(pool, user_id, &plan).await.unwrap()
}
