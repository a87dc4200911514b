//! Event (task definition) validation and creation planning.
//!
//! Creating an event produces an [`EventPlan`]: the normalized fields plus a
//! schedule. A recurring schedule always carries its first occurrence, so a
//! rule without an anchor cannot be represented.

use chrono::Duration;
use serde::Deserialize;

use crate::error::{CoreError, FieldErrors, Issues};
use crate::occurrence::{drafts_from_starts, validate_draft, OccurrenceDraft};
use crate::patch::{double_option, unknown_fields_message, UnknownFields};
use crate::recurrence::{RecurrenceRule, MAX_RRULE_LENGTH};
use crate::status::Visibility;
use crate::time::{parse_instant, start_of_day};
use crate::types::Timestamp;

/// Maximum title length, after trimming.
pub const TITLE_MAX_LENGTH: usize = 120;

/// Maximum tag length, after trimming.
pub const TAG_MAX_LENGTH: usize = 32;

/// Shortest allowed duration, in minutes.
pub const MIN_DURATION_MINUTES: i32 = 5;

/// Longest allowed duration, in minutes. Also the duration of all-day events.
pub const MAX_DURATION_MINUTES: i32 = 1440;

/// Default occurrence window when listing events with their occurrences.
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of `POST /events`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tag: Option<String>,
    pub visibility: Option<String>,
    pub duration_minutes: Option<f64>,
    pub is_all_day: Option<bool>,
    pub rrule: Option<String>,
    pub exdates: Option<Vec<Timestamp>>,
    pub first_occurrence: Option<FirstOccurrenceRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FirstOccurrenceRequest {
    pub start_at: Timestamp,
    pub end_at: Timestamp,
    pub notes: Option<String>,
}

/// Body of `PATCH /events/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub tag: Option<Option<String>>,
    pub visibility: Option<String>,
    pub duration_minutes: Option<i64>,
    pub is_all_day: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub rrule: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub exdates: Option<Option<Vec<Timestamp>>>,
    #[serde(flatten)]
    pub unknown: UnknownFields,
}

impl UpdateEventRequest {
    /// True when the body named no field at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.tag.is_none()
            && self.visibility.is_none()
            && self.duration_minutes.is_none()
            && self.is_all_day.is_none()
            && self.rrule.is_none()
            && self.exdates.is_none()
            && self.unknown.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Validated shapes
// ---------------------------------------------------------------------------

/// Normalized event columns.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFields {
    pub title: String,
    pub description: Option<String>,
    pub tag: Option<String>,
    pub visibility: Visibility,
    pub duration_minutes: i32,
    pub is_all_day: bool,
    pub exdates: Vec<Timestamp>,
}

/// How the event's occurrences come into being.
#[derive(Debug, Clone, PartialEq)]
pub enum EventSchedule {
    /// No rule; at most one occurrence supplied up front.
    OneOff { first: Option<OccurrenceDraft> },
    /// A recurrence rule anchored at its mandatory first occurrence.
    Recurring {
        rrule: String,
        rule: RecurrenceRule,
        first: OccurrenceDraft,
    },
}

/// Everything needed to persist a new event in one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPlan {
    pub fields: EventFields,
    pub schedule: EventSchedule,
}

impl EventPlan {
    pub fn rrule(&self) -> Option<&str> {
        match &self.schedule {
            EventSchedule::OneOff { .. } => None,
            EventSchedule::Recurring { rrule, .. } => Some(rrule),
        }
    }

    /// Occurrences to create with the event, first occurrence first.
    pub fn occurrences(&self) -> Vec<OccurrenceDraft> {
        match &self.schedule {
            EventSchedule::OneOff { first } => first.iter().cloned().collect(),
            EventSchedule::Recurring { rule, first, .. } => {
                let starts = rule.starts_after(first.start_at);
                let mut all = Vec::with_capacity(starts.len() + 1);
                all.push(first.clone());
                all.extend(drafts_from_starts(
                    &starts,
                    self.fields.duration_minutes,
                    first.notes.as_deref(),
                ));
                all
            }
        }
    }
}

/// Validated partial update. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub tag: Option<Option<String>>,
    pub visibility: Option<Visibility>,
    pub duration_minutes: Option<i32>,
    pub is_all_day: Option<bool>,
    pub rrule: Option<Option<String>>,
    pub exdates: Option<Vec<Timestamp>>,
}

impl EventChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// Field validators
// ---------------------------------------------------------------------------

pub fn validate_title(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("title is required.".into());
    }
    if trimmed.chars().count() > TITLE_MAX_LENGTH {
        return Err(format!(
            "title must be {TITLE_MAX_LENGTH} characters or less."
        ));
    }
    Ok(trimmed.to_string())
}

/// Trimmed tag; blank becomes `None`.
pub fn validate_tag(raw: &str) -> Result<Option<String>, String> {
    let trimmed = raw.trim();
    if trimmed.chars().count() > TAG_MAX_LENGTH {
        return Err(format!("tag must be {TAG_MAX_LENGTH} characters or less."));
    }
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

pub fn validate_visibility(raw: &str) -> Result<Visibility, String> {
    Visibility::parse(raw).ok_or_else(|| "visibility must be PRIVATE or PUBLIC.".to_string())
}

pub fn validate_duration(minutes: i64) -> Result<i32, String> {
    i32::try_from(minutes)
        .ok()
        .filter(|m| (MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(m))
        .ok_or_else(|| {
            format!(
                "duration_minutes must be an integer between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES}."
            )
        })
}

/// Trimmed, parsed rule. The raw string must be non-blank and within the
/// stored length limit.
pub fn validate_rrule(raw: &str) -> Result<(String, RecurrenceRule), CoreError> {
    if raw.chars().count() > MAX_RRULE_LENGTH {
        return Err(field_error(
            "rrule",
            format!("rrule must be {MAX_RRULE_LENGTH} characters or less."),
        ));
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(field_error("rrule", "rrule must not be empty."));
    }
    let rule = trimmed.parse::<RecurrenceRule>()?;
    Ok((trimmed.to_string(), rule))
}

fn normalize_description(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn field_error(field: &str, message: impl Into<String>) -> CoreError {
    CoreError::Validation(FieldErrors::from([(field.to_string(), message.into())]))
}

// ---------------------------------------------------------------------------
// Create / update
// ---------------------------------------------------------------------------

/// Validate a create request into an [`EventPlan`].
///
/// Field problems are aggregated into one `VALIDATION_ERROR`; a rule that
/// passes the shape checks but cannot be expanded fails afterwards with
/// `INVALID_RRULE`.
pub fn validate_create(input: &CreateEventRequest) -> Result<EventPlan, CoreError> {
    let mut issues = Issues::new();

    let title = issues.check("title", validate_title(input.title.as_deref().unwrap_or("")));

    let is_all_day = input.is_all_day.unwrap_or(false);
    let duration = match input.duration_minutes {
        Some(m) if m.is_finite() => issues.check("duration_minutes", validate_duration(m.floor() as i64)),
        None if is_all_day => Some(MAX_DURATION_MINUTES),
        _ => {
            issues.add(
                "duration_minutes",
                format!(
                    "duration_minutes must be an integer between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES}."
                ),
            );
            None
        }
    };

    let visibility = match input.visibility.as_deref() {
        Some(v) => issues.check("visibility", validate_visibility(v)),
        None => Some(Visibility::Private),
    };

    let tag = match input.tag.as_deref() {
        Some(t) => issues.check("tag", validate_tag(t)),
        None => Some(None),
    };

    let rrule = match input.rrule.as_deref() {
        None => None,
        Some(raw) if raw.chars().count() > MAX_RRULE_LENGTH => {
            issues.add(
                "rrule",
                format!("rrule must be {MAX_RRULE_LENGTH} characters or less."),
            );
            None
        }
        Some(raw) if raw.trim().is_empty() => {
            issues.add("rrule", "rrule must not be empty.");
            None
        }
        Some(raw) => Some(raw.trim().to_string()),
    };

    let first = match (&input.first_occurrence, duration) {
        (Some(f), Some(duration)) => validate_draft(
            f.start_at,
            f.end_at,
            f.notes.as_deref(),
            duration,
            is_all_day,
        )
        .map_err(|(_, message)| issues.add("first_occurrence", message))
        .ok(),
        _ => None,
    };

    if rrule.is_some() && input.first_occurrence.is_none() {
        issues.add(
            "first_occurrence",
            "first_occurrence is required when rrule is provided.",
        );
    }

    issues.finish()?;

    let (Some(title), Some(duration_minutes), Some(visibility), Some(tag)) =
        (title, duration, visibility, tag)
    else {
        return Err(CoreError::Internal("validated fields missing".into()));
    };

    let schedule = match (rrule, first) {
        (Some(rrule), Some(first)) => {
            let rule = rrule.parse::<RecurrenceRule>()?;
            EventSchedule::Recurring { rrule, rule, first }
        }
        (None, first) => EventSchedule::OneOff { first },
        (Some(_), None) => {
            return Err(CoreError::Internal("recurring event without anchor".into()))
        }
    };

    Ok(EventPlan {
        fields: EventFields {
            title,
            description: input.description.as_deref().and_then(normalize_description),
            tag,
            visibility,
            duration_minutes,
            is_all_day,
            exdates: input.exdates.clone().unwrap_or_default(),
        },
        schedule,
    })
}

/// Validate a partial update.
///
/// Turning `is_all_day` on without an explicit duration sets the duration
/// to a full day. A `null` exdates list clears it.
pub fn validate_update(input: &UpdateEventRequest) -> Result<EventChanges, CoreError> {
    let mut issues = Issues::new();
    let mut changes = EventChanges::default();

    if let Some(message) = unknown_fields_message(&input.unknown) {
        issues.add("unknown", message);
    }

    if let Some(title) = &input.title {
        changes.title = issues.check("title", validate_title(title));
    }
    if let Some(description) = &input.description {
        changes.description = Some(description.as_deref().and_then(normalize_description));
    }
    if let Some(tag) = &input.tag {
        changes.tag = match tag {
            None => Some(None),
            Some(t) => issues.check("tag", validate_tag(t)),
        };
    }
    if let Some(visibility) = &input.visibility {
        changes.visibility = issues.check("visibility", validate_visibility(visibility));
    }
    if let Some(minutes) = input.duration_minutes {
        changes.duration_minutes = issues.check("duration_minutes", validate_duration(minutes));
    }
    if let Some(all_day) = input.is_all_day {
        changes.is_all_day = Some(all_day);
        if all_day && input.duration_minutes.is_none() {
            changes.duration_minutes = Some(MAX_DURATION_MINUTES);
        }
    }
    if let Some(rrule) = &input.rrule {
        changes.rrule = match rrule {
            None => Some(None),
            Some(raw) => match validate_rrule(raw) {
                Ok((rule, _)) => Some(Some(rule)),
                Err(CoreError::Validation(fields)) => {
                    for (field, message) in fields {
                        issues.add(&field, message);
                    }
                    None
                }
                Err(err) => {
                    issues.add("rrule", err.to_string());
                    None
                }
            },
        };
    }
    if let Some(exdates) = &input.exdates {
        changes.exdates = Some(exdates.clone().unwrap_or_default());
    }

    issues.finish()?;
    Ok(changes)
}

// ---------------------------------------------------------------------------
// Occurrence window
// ---------------------------------------------------------------------------

/// Resolve `range_start`/`range_end` parameters for listing an event's
/// occurrences (start inclusive, end exclusive).
///
/// A lone bound is widened by [`DEFAULT_WINDOW_DAYS`] in the other
/// direction; with neither, the window starts at today's UTC midnight.
pub fn resolve_window(
    range_start: Option<&str>,
    range_end: Option<&str>,
    now: Timestamp,
) -> Result<(Timestamp, Timestamp), CoreError> {
    let parse = |raw: Option<&str>, name: &str| -> Result<Option<Timestamp>, CoreError> {
        match raw {
            None => Ok(None),
            Some(value) => parse_instant(value).map(Some).ok_or_else(|| {
                CoreError::invalid("INVALID_RANGE", format!("{name} must be a valid ISO date."))
            }),
        }
    };
    let start = parse(range_start, "range_start")?;
    let end = parse(range_end, "range_end")?;
    let window = Duration::days(DEFAULT_WINDOW_DAYS);

    match (start, end) {
        (Some(s), Some(e)) if e <= s => Err(CoreError::invalid(
            "INVALID_RANGE",
            "range_end must be later than range_start.",
        )),
        (Some(s), Some(e)) => Ok((s, e)),
        (Some(s), None) => Ok((s, s + window)),
        (None, Some(e)) => Ok((e - window, e)),
        (None, None) => {
            let today = start_of_day(now);
            Ok((today, today + window))
        }
    }
}

pub fn event_not_found() -> CoreError {
    CoreError::not_found("EVENT_NOT_FOUND", "Event not found.")
}
