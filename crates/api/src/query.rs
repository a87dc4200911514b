//! Query-string parameter types for API handlers.
//!
//! Every field is taken as a raw string so that parsing failures surface as
//! domain error codes (`INVALID_LIMIT`, `INVALID_RANGE`, ...) rather than
//! as axum's plain-text query rejection.

use serde::Deserialize;
use taskwatch_core::error::CoreError;
use taskwatch_core::types::DbId;

/// `GET /events` and `GET /events/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct EventListParams {
    pub with_occurrences: Option<String>,
    pub range_start: Option<String>,
    pub range_end: Option<String>,
}

impl EventListParams {
    pub fn with_occurrences(&self) -> bool {
        is_truthy(self.with_occurrences.as_deref())
    }
}

/// `GET /occurrences`.
#[derive(Debug, Default, Deserialize)]
pub struct OccurrenceRangeParams {
    pub start: Option<String>,
    pub end: Option<String>,
    pub status: Option<String>,
}

/// `GET /occurrences/pending`.
#[derive(Debug, Default, Deserialize)]
pub struct PendingParams {
    pub before: Option<String>,
    pub cursor_id: Option<String>,
    pub limit: Option<String>,
}

/// `GET /stats/mypage`.
#[derive(Debug, Default, Deserialize)]
pub struct WeekParams {
    pub week_start: Option<String>,
}

/// `GET /rankings`.
#[derive(Debug, Default, Deserialize)]
pub struct RankingParams {
    pub metric: Option<String>,
    pub period: Option<String>,
}

/// `GET /timeline`.
#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    pub cursor: Option<String>,
    pub limit: Option<String>,
}

impl FeedParams {
    /// The post id to continue after. Non-numeric cursors are `INVALID_CURSOR`.
    pub fn cursor(&self) -> Result<Option<DbId>, CoreError> {
        match self.cursor.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(raw) => raw.parse::<DbId>().map(Some).map_err(|_| {
                CoreError::not_found("INVALID_CURSOR", "Cursor does not reference an accessible post.")
            }),
        }
    }
}

/// `GET /friendships/requests`.
#[derive(Debug, Default, Deserialize)]
pub struct RequestListParams {
    pub direction: Option<String>,
    pub include_history: Option<String>,
}

impl RequestListParams {
    pub fn include_history(&self) -> bool {
        is_truthy(self.include_history.as_deref())
    }
}

/// `GET /users/search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// `true`, `1` and `yes` (any case) are set; anything else is not.
fn is_truthy(raw: Option<&str>) -> bool {
    raw.map(str::trim).is_some_and(|v| {
        v.eq_ignore_ascii_case("true") || v == "1" || v.eq_ignore_ascii_case("yes")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_flags() {
        assert!(is_truthy(Some("true")));
        assert!(is_truthy(Some(" TRUE ")));
        assert!(is_truthy(Some("1")));
        assert!(!is_truthy(Some("false")));
        assert!(!is_truthy(Some("")));
        assert!(!is_truthy(None));
    }

    #[test]
    fn feed_cursor_parsing() {
        let params = FeedParams {
            cursor: Some("17".into()),
            limit: None,
        };
        assert_eq!(params.cursor().unwrap(), Some(17));

        let blank = FeedParams::default();
        assert_eq!(blank.cursor().unwrap(), None);

        let junk = FeedParams {
            cursor: Some("abc".into()),
            limit: None,
        };
        assert_eq!(junk.cursor().unwrap_err().code(), "INVALID_CURSOR");
    }
}
