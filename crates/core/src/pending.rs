//! The pending-work query: scheduled occurrences that ended before a cutoff
//! and were never marked done or missed.
//!
//! Pages are ordered by `(end_at, id)` ascending and continue strictly after
//! a cursor occurrence. Clients fetch the first page without a cutoff, then
//! echo the returned `cutoff` on later pages so the result set stays stable.

use crate::error::CoreError;
use crate::search::{parse_limit, DEFAULT_PENDING_LIMIT, MAX_PENDING_LIMIT};
use crate::time::{elapsed_minutes, parse_instant};
use crate::types::{DbId, Timestamp};

/// Resolved pending-query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingQuery {
    pub cutoff: Timestamp,
    pub cursor_id: Option<DbId>,
    pub limit: i64,
}

impl PendingQuery {
    /// Validate raw `before`, `cursor_id` and `limit` parameters.
    ///
    /// A missing `before` means `now`.
    pub fn resolve(
        before: Option<&str>,
        cursor_id: Option<&str>,
        limit: Option<&str>,
        now: Timestamp,
    ) -> Result<Self, CoreError> {
        let cutoff = match before.map(str::trim).filter(|s| !s.is_empty()) {
            None => now,
            Some(raw) => parse_instant(raw).ok_or_else(|| {
                CoreError::invalid("INVALID_BEFORE", "before must be a valid ISO date string.")
            })?,
        };

        let cursor_id = match cursor_id.map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(raw) => Some(raw.parse::<DbId>().map_err(|_| invalid_cursor())?),
        };

        let limit = parse_limit(limit, DEFAULT_PENDING_LIMIT, MAX_PENDING_LIMIT)?;

        Ok(Self {
            cutoff,
            cursor_id,
            limit,
        })
    }
}

/// A cursor that does not reference a row matching the current filter.
pub fn invalid_cursor() -> CoreError {
    CoreError::not_found(
        "INVALID_CURSOR",
        "Cursor does not reference a pending occurrence.",
    )
}

/// Whole minutes an occurrence has been overdue at `cutoff`, never negative.
pub fn overdue_minutes(cutoff: Timestamp, end_at: Timestamp) -> i64 {
    elapsed_minutes(end_at, cutoff)
}
