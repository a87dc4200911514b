//! Occurrence entity models.

use serde::Serialize;
use sqlx::FromRow;
use taskwatch_core::status::{OccurrenceStatus, StatusId, Visibility};
use taskwatch_core::types::{DbId, Timestamp};

use crate::models::event::EventSummary;

/// A row from the `occurrences` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Occurrence {
    pub id: DbId,
    pub event_id: DbId,
    pub user_id: DbId,
    pub start_at: Timestamp,
    pub end_at: Timestamp,
    #[sqlx(rename = "status_id", try_from = "i16")]
    pub status: OccurrenceStatus,
    pub is_all_day: bool,
    pub completed_at: Option<Timestamp>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// An occurrence joined with its parent event's summary columns.
#[derive(Debug, Clone, FromRow)]
pub struct OccurrenceEventRow {
    #[sqlx(flatten)]
    pub occurrence: Occurrence,
    pub event_title: String,
    pub event_rrule: Option<String>,
    pub event_tag: Option<String>,
    pub event_visibility_id: StatusId,
}

/// Serialized form of [`OccurrenceEventRow`].
#[derive(Debug, Clone, Serialize)]
pub struct OccurrenceWithEvent {
    #[serde(flatten)]
    pub occurrence: Occurrence,
    pub event: EventSummary,
}

impl From<OccurrenceEventRow> for OccurrenceWithEvent {
    fn from(row: OccurrenceEventRow) -> Self {
        let event = EventSummary {
            id: row.occurrence.event_id,
            title: row.event_title,
            rrule: row.event_rrule,
            tag: row.event_tag,
            visibility: Visibility::try_from(row.event_visibility_id).unwrap_or_default(),
        };
        Self {
            occurrence: row.occurrence,
            event,
        }
    }
}

/// One page of the pending-work query.
#[derive(Debug, Clone)]
pub struct PendingPage {
    pub items: Vec<OccurrenceWithEvent>,
    /// Matches across every page.
    pub total: i64,
}
