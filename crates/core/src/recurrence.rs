//! Recurrence rule parsing and expansion.
//!
//! A rule is a `;`-separated list of `KEY=VALUE` pairs in the iCalendar
//! RRULE shape, optionally prefixed with `RRULE:`. Only `FREQ` (DAILY or
//! WEEKLY) and `INTERVAL` drive expansion; other standard RRULE parts are
//! accepted and ignored. Expansion is capped both by count and by how far
//! it may reach past the first start.

use std::str::FromStr;

use chrono::Duration;

use crate::types::Timestamp;

/// Maximum number of instances in a series, including the first one.
pub const MAX_OCCURRENCES: usize = 12;

/// No generated instance may start later than this many days after the first.
pub const MAX_RANGE_DAYS: i64 = 90;

/// Maximum accepted length of a stored rule string.
pub const MAX_RRULE_LENGTH: usize = 2000;

/// RRULE parts that are understood but have no effect on expansion.
const IGNORED_KEYS: &[&str] = &[
    "BYDAY",
    "BYMONTHDAY",
    "BYMONTH",
    "BYYEARDAY",
    "BYWEEKNO",
    "BYHOUR",
    "BYMINUTE",
    "BYSECOND",
    "BYSETPOS",
    "WKST",
    "COUNT",
    "UNTIL",
];

/// RRULE frequencies that exist but cannot be expanded here.
const UNSUPPORTED_FREQUENCIES: &[&str] = &["SECONDLY", "MINUTELY", "HOURLY", "MONTHLY", "YEARLY"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RecurrenceError {
    #[error("Invalid rrule format.")]
    InvalidFormat,
    #[error("Unsupported recurrence frequency.")]
    UnsupportedFrequency,
    #[error("Interval must be greater than 0.")]
    InvalidInterval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
}

/// A parsed, expandable recurrence rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
}

impl RecurrenceRule {
    /// Distance between consecutive instances.
    pub fn step(&self) -> Duration {
        let days = match self.frequency {
            Frequency::Daily => i64::from(self.interval),
            Frequency::Weekly => i64::from(self.interval) * 7,
        };
        Duration::days(days)
    }

    /// Starts following `first_start`, in increasing order, excluding
    /// `first_start` itself.
    ///
    /// Stepping past the representable date range ends the series.
    pub fn starts_after(&self, first_start: Timestamp) -> Vec<Timestamp> {
        let mut starts = Vec::with_capacity(MAX_OCCURRENCES - 1);
        let step = self.step();
        if step > Duration::days(MAX_RANGE_DAYS) {
            return starts;
        }
        let Some(limit) = first_start.checked_add_signed(Duration::days(MAX_RANGE_DAYS)) else {
            return starts;
        };

        let mut next = first_start.checked_add_signed(step);
        while let Some(start) = next.filter(|s| *s <= limit) {
            if starts.len() == MAX_OCCURRENCES - 1 {
                break;
            }
            starts.push(start);
            next = start.checked_add_signed(step);
        }
        starts
    }
}

impl FromStr for RecurrenceRule {
    type Err = RecurrenceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let body = match trimmed.get(..6) {
            Some(prefix) if prefix.eq_ignore_ascii_case("RRULE:") => &trimmed[6..],
            _ => trimmed,
        };

        let mut freq: Option<String> = None;
        let mut interval: Option<i64> = None;

        for part in body.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or(RecurrenceError::InvalidFormat)?;
            let key = key.trim().to_ascii_uppercase();
            let value = value.trim();

            match key.as_str() {
                "FREQ" => freq = Some(value.to_ascii_uppercase()),
                "INTERVAL" => {
                    let n = value
                        .parse::<i64>()
                        .map_err(|_| RecurrenceError::InvalidFormat)?;
                    interval = Some(n);
                }
                k if IGNORED_KEYS.contains(&k) => {}
                _ => return Err(RecurrenceError::InvalidFormat),
            }
        }

        let frequency = match freq.as_deref() {
            Some("DAILY") => Frequency::Daily,
            Some("WEEKLY") => Frequency::Weekly,
            Some(f) if UNSUPPORTED_FREQUENCIES.contains(&f) => {
                return Err(RecurrenceError::UnsupportedFrequency)
            }
            _ => return Err(RecurrenceError::InvalidFormat),
        };

        let interval = interval.unwrap_or(1);
        if interval <= 0 {
            return Err(RecurrenceError::InvalidInterval);
        }
        let interval = u32::try_from(interval).map_err(|_| RecurrenceError::InvalidFormat)?;

        Ok(Self {
            frequency,
            interval,
        })
    }
}

/// Expand `rule` into the starts that follow `first_start`.
///
/// The result excludes `first_start`, is strictly increasing, has at most
/// `MAX_OCCURRENCES - 1` entries and never reaches past
/// `first_start + MAX_RANGE_DAYS`.
pub fn expand(rule: &str, first_start: Timestamp) -> Result<Vec<Timestamp>, RecurrenceError> {
    let rule: RecurrenceRule = rule.parse()?;
    Ok(rule.starts_after(first_start))
}
