//! Page-size constants and query-parameter helpers for paginated listings.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Pagination defaults
// ---------------------------------------------------------------------------

/// Default page size for the pending-work query.
pub const DEFAULT_PENDING_LIMIT: i64 = 50;

/// Maximum page size for the pending-work query.
pub const MAX_PENDING_LIMIT: i64 = 200;

/// Default page size for the timeline feed.
pub const DEFAULT_TIMELINE_LIMIT: i64 = 20;

/// Maximum page size for the timeline feed.
pub const MAX_TIMELINE_LIMIT: i64 = 50;

/// Maximum number of user search results.
pub const MAX_USER_SEARCH_RESULTS: i64 = 10;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Clamp a limit value to a valid range, applying a default when absent.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Parse a raw `limit` query parameter.
///
/// Absent means `default`; anything that is not a positive integer is an
/// `INVALID_LIMIT` error; values above `max` are capped.
pub fn parse_limit(raw: Option<&str>, default: i64, max: i64) -> Result<i64, CoreError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => Ok(clamp_limit(Some(n), default, max)),
        _ => Err(CoreError::invalid(
            "INVALID_LIMIT",
            "limit must be a positive integer.",
        )),
    }
}

/// Trim a `limit + 1` fetch down to `limit` rows, reporting whether the
/// extra row existed.
pub fn split_page<T>(mut rows: Vec<T>, limit: i64) -> (Vec<T>, bool) {
    let limit = usize::try_from(limit).unwrap_or(0);
    let has_more = rows.len() > limit;
    rows.truncate(limit);
    (rows, has_more)
}
