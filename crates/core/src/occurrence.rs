//! Occurrence lifecycle rules.
//!
//! Occurrences are the concrete, time-boxed instances of an event. Their
//! status moves `SCHEDULED -> DONE | MISSED` and may flip between `DONE` and
//! `MISSED`, but never returns to `SCHEDULED`.

use chrono::Duration;
use serde::Deserialize;

use crate::error::{CoreError, FieldErrors, Issues};
use crate::patch::{double_option, unknown_fields_message, UnknownFields};
use crate::status::OccurrenceStatus;
use crate::time::{minutes_between, parse_instant};
use crate::types::Timestamp;

/// Maximum length of occurrence notes, after trimming.
pub const NOTES_MAX_LENGTH: usize = 1000;

/// Maximum span of a range listing, in days.
pub const MAX_LIST_RANGE_DAYS: i64 = 31;

// ---------------------------------------------------------------------------
// Status transitions
// ---------------------------------------------------------------------------

/// Targets reachable from `from`.
pub fn allowed_transitions(from: OccurrenceStatus) -> &'static [OccurrenceStatus] {
    match from {
        OccurrenceStatus::Scheduled => &[OccurrenceStatus::Done, OccurrenceStatus::Missed],
        OccurrenceStatus::Done => &[OccurrenceStatus::Missed],
        OccurrenceStatus::Missed => &[OccurrenceStatus::Done],
    }
}

/// Check that `from -> to` is a legal transition.
///
/// Requesting the current status again is a `STATUS_UNCHANGED` conflict.
pub fn check_transition(from: OccurrenceStatus, to: OccurrenceStatus) -> Result<(), CoreError> {
    if from == to {
        return Err(CoreError::conflict(
            "STATUS_UNCHANGED",
            format!("Occurrence is already {to}."),
        ));
    }
    if !allowed_transitions(from).contains(&to) {
        return Err(CoreError::invalid(
            "INVALID_TRANSITION",
            format!("Cannot change status from {from} to {to}."),
        ));
    }
    Ok(())
}

/// A validated status change request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: OccurrenceStatus,
    /// Set only when `status` is `DONE`.
    pub completed_at: Option<Timestamp>,
    /// `None` leaves existing notes untouched.
    pub notes: Option<Option<String>>,
}

/// Validate a status change body.
///
/// `status` must be `DONE` or `MISSED`; `completed_at` is required for
/// `DONE` and rejected for `MISSED`.
pub fn validate_status_change(
    status: Option<&str>,
    completed_at: Option<Timestamp>,
    notes: Option<&str>,
) -> Result<StatusChange, CoreError> {
    let mut issues = Issues::new();

    let status = match status.and_then(OccurrenceStatus::parse) {
        Some(s @ (OccurrenceStatus::Done | OccurrenceStatus::Missed)) => Some(s),
        _ => {
            issues.add("status", "status must be DONE or MISSED.");
            None
        }
    };

    match (status, completed_at) {
        (Some(OccurrenceStatus::Done), None) => {
            issues.add("completed_at", "completed_at is required when status is DONE.");
        }
        (Some(OccurrenceStatus::Missed), Some(_)) => {
            issues.add("completed_at", "completed_at is only allowed when status is DONE.");
        }
        _ => {}
    }

    let notes = notes.and_then(|n| issues.check("notes", normalize_notes(n)));

    issues.finish()?;
    let status = status.ok_or_else(|| CoreError::Internal("status missing".into()))?;

    Ok(StatusChange {
        status,
        completed_at: if status == OccurrenceStatus::Done {
            completed_at
        } else {
            None
        },
        notes,
    })
}

// ---------------------------------------------------------------------------
// Field validation
// ---------------------------------------------------------------------------

/// Trim notes; empty becomes `None`.
pub fn normalize_notes(raw: &str) -> Result<Option<String>, String> {
    let trimmed = raw.trim();
    if trimmed.chars().count() > NOTES_MAX_LENGTH {
        return Err(format!(
            "notes must be at most {NOTES_MAX_LENGTH} characters."
        ));
    }
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

/// Reject ranges whose end is not strictly after their start.
pub fn ensure_valid_range(start: Timestamp, end: Timestamp) -> Result<(), CoreError> {
    if end <= start {
        return Err(CoreError::invalid(
            "INVALID_RANGE",
            "end must be later than start.",
        ));
    }
    Ok(())
}

/// Merge a partial reschedule into the current bounds and validate the result.
pub fn resolve_reschedule(
    current_start: Timestamp,
    current_end: Timestamp,
    start: Option<Timestamp>,
    end: Option<Timestamp>,
) -> Result<(Timestamp, Timestamp), CoreError> {
    let start = start.unwrap_or(current_start);
    let end = end.unwrap_or(current_end);
    ensure_valid_range(start, end)?;
    Ok((start, end))
}

/// An occurrence about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceDraft {
    pub start_at: Timestamp,
    pub end_at: Timestamp,
    pub notes: Option<String>,
}

/// Validate a single occurrence against its event's duration.
///
/// For timed events the wall-clock span must equal `duration_minutes`;
/// all-day occurrences only need a positive span. Errors name the offending
/// sub-field (`end_at` or `notes`).
pub fn validate_draft(
    start_at: Timestamp,
    end_at: Timestamp,
    notes: Option<&str>,
    duration_minutes: i32,
    is_all_day: bool,
) -> Result<OccurrenceDraft, (&'static str, String)> {
    if end_at <= start_at {
        return Err(("end_at", "end_at must be later than start_at.".into()));
    }
    if !is_all_day && minutes_between(start_at, end_at) != i64::from(duration_minutes) {
        return Err((
            "end_at",
            format!("Occurrence duration must match duration_minutes ({duration_minutes})."),
        ));
    }
    let notes = match notes {
        Some(n) => normalize_notes(n).map_err(|m| ("notes", m))?,
        None => None,
    };
    Ok(OccurrenceDraft {
        start_at,
        end_at,
        notes,
    })
}

/// Occurrences generated from a recurrence rule: one per start, each lasting
/// `duration_minutes` and inheriting the first occurrence's notes.
pub fn drafts_from_starts(
    starts: &[Timestamp],
    duration_minutes: i32,
    notes: Option<&str>,
) -> Vec<OccurrenceDraft> {
    let length = Duration::minutes(i64::from(duration_minutes));
    starts
        .iter()
        .map(|start| OccurrenceDraft {
            start_at: *start,
            end_at: *start + length,
            notes: notes.map(str::to_string),
        })
        .collect()
}

/// Body of `POST /events/{id}/occurrences`.
#[derive(Debug, Deserialize)]
pub struct CreateOccurrenceRequest {
    pub start_at: Timestamp,
    pub end_at: Timestamp,
    pub notes: Option<String>,
}

/// Validate a single manually-added occurrence for an event.
pub fn validate_new_occurrence(
    input: &CreateOccurrenceRequest,
    duration_minutes: i32,
    is_all_day: bool,
) -> Result<OccurrenceDraft, CoreError> {
    validate_draft(
        input.start_at,
        input.end_at,
        input.notes.as_deref(),
        duration_minutes,
        is_all_day,
    )
    .map_err(|(field, message)| {
        CoreError::Validation(FieldErrors::from([(field.to_string(), message)]))
    })
}

/// Body of `PATCH /occurrences/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateOccurrenceRequest {
    pub start_at: Option<Timestamp>,
    pub end_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

impl UpdateOccurrenceRequest {
    /// True when the body named no field at all.
    pub fn is_empty(&self) -> bool {
        self.start_at.is_none()
            && self.end_at.is_none()
            && self.notes.is_none()
            && self.unknown.is_empty()
    }
}

/// Validated reschedule/annotate changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceChanges {
    pub start_at: Timestamp,
    pub end_at: Timestamp,
    /// `None` leaves notes untouched; `Some(None)` clears them.
    pub notes: Option<Option<String>>,
}

/// Validate a reschedule/annotate body against the occurrence's current bounds.
pub fn validate_update(
    input: &UpdateOccurrenceRequest,
    current_start: Timestamp,
    current_end: Timestamp,
) -> Result<OccurrenceChanges, CoreError> {
    let mut issues = Issues::new();
    if let Some(message) = unknown_fields_message(&input.unknown) {
        issues.add("unknown", message);
    }
    let notes = match &input.notes {
        None => None,
        Some(None) => Some(None),
        Some(Some(raw)) => issues.check("notes", normalize_notes(raw)),
    };
    issues.finish()?;

    let (start_at, end_at) =
        resolve_reschedule(current_start, current_end, input.start_at, input.end_at)?;
    Ok(OccurrenceChanges {
        start_at,
        end_at,
        notes,
    })
}

/// Body of `PATCH /occurrences/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: Option<String>,
    pub completed_at: Option<Timestamp>,
    pub notes: Option<String>,
}

impl StatusChangeRequest {
    pub fn validate(&self) -> Result<StatusChange, CoreError> {
        validate_status_change(
            self.status.as_deref(),
            self.completed_at,
            self.notes.as_deref(),
        )
    }
}

// ---------------------------------------------------------------------------
// Delete policy
// ---------------------------------------------------------------------------

/// Single occurrences may be deleted only while they have not ended.
pub fn ensure_deletable(end_at: Timestamp, now: Timestamp) -> Result<(), CoreError> {
    if end_at <= now {
        return Err(CoreError::conflict(
            "DELETE_NOT_ALLOWED",
            "Occurrences that have already ended cannot be deleted.",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Range listing
// ---------------------------------------------------------------------------

/// Validate `start`/`end` query parameters for a range listing.
pub fn resolve_listing_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(Timestamp, Timestamp), CoreError> {
    let (Some(start), Some(end)) = (start, end) else {
        return Err(CoreError::invalid(
            "MISSING_RANGE",
            "start and end query parameters are required.",
        ));
    };
    let (Some(start), Some(end)) = (parse_instant(start), parse_instant(end)) else {
        return Err(CoreError::invalid(
            "INVALID_RANGE",
            "start and end must be valid ISO dates.",
        ));
    };
    ensure_valid_range(start, end)?;
    if end - start > Duration::days(MAX_LIST_RANGE_DAYS) {
        return Err(CoreError::invalid(
            "RANGE_TOO_LARGE",
            format!("Requested range must be {MAX_LIST_RANGE_DAYS} days or less."),
        ));
    }
    Ok((start, end))
}

/// Parse an optional `status` filter.
pub fn parse_status_filter(raw: Option<&str>) -> Result<Option<OccurrenceStatus>, CoreError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => OccurrenceStatus::parse(s).map(Some).ok_or_else(|| {
            CoreError::invalid(
                "INVALID_STATUS",
                "status must be SCHEDULED, DONE, or MISSED.",
            )
        }),
    }
}

pub fn occurrence_not_found() -> CoreError {
    CoreError::not_found("OCCURRENCE_NOT_FOUND", "Occurrence not found.")
}
