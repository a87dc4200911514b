//! Event entity models.

use serde::Serialize;
use sqlx::FromRow;
use taskwatch_core::status::Visibility;
use taskwatch_core::types::{DbId, Timestamp};

use crate::models::occurrence::Occurrence;

/// A row from the `events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: DbId,
    pub user_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub tag: Option<String>,
    #[sqlx(rename = "visibility_id", try_from = "i16")]
    pub visibility: Visibility,
    pub duration_minutes: i32,
    pub is_all_day: bool,
    pub rrule: Option<String>,
    pub exdates: Vec<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// An event together with a window of its occurrences.
#[derive(Debug, Clone, Serialize)]
pub struct EventWithOccurrences {
    #[serde(flatten)]
    pub event: Event,
    pub occurrences: Vec<Occurrence>,
}

/// The parent-event fields embedded in occurrence listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    pub id: DbId,
    pub title: String,
    pub rrule: Option<String>,
    pub tag: Option<String>,
    pub visibility: Visibility,
}
