//! UTC calendar helpers shared by statistics, rankings and range queries.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};

use crate::types::Timestamp;

/// Milliseconds per minute.
const MINUTE_MS: i64 = 60_000;

/// Wall-clock minutes between two instants, rounded to the nearest minute
/// and never negative.
pub fn minutes_between(start: Timestamp, end: Timestamp) -> i64 {
    let ms = (end - start).num_milliseconds();
    (ms + MINUTE_MS / 2).div_euclid(MINUTE_MS).max(0)
}

/// Whole minutes elapsed from `from` to `to`, truncated, never negative.
pub fn elapsed_minutes(from: Timestamp, to: Timestamp) -> i64 {
    ((to - from).num_milliseconds() / MINUTE_MS).max(0)
}

/// Parse an ISO-8601 instant. Plain `YYYY-MM-DD` dates resolve to UTC midnight.
pub fn parse_instant(value: &str) -> Option<Timestamp> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(date_start)
}

/// UTC midnight at the start of `date`.
pub fn date_start(date: NaiveDate) -> Timestamp {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// UTC midnight on the same day as `ts`.
pub fn start_of_day(ts: Timestamp) -> Timestamp {
    date_start(ts.date_naive())
}

/// The Monday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_monday());
    date - Days::new(offset)
}

/// Inclusive list of calendar days from `first` to `last`.
pub fn days_inclusive(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    first.iter_days().take_while(|d| *d <= last).collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn minutes_round_to_nearest() {
        let start = at(2024, 4, 1, 9, 0, 0);
        assert_eq!(minutes_between(start, at(2024, 4, 1, 9, 30, 0)), 30);
        assert_eq!(minutes_between(start, at(2024, 4, 1, 9, 0, 29)), 0);
        assert_eq!(minutes_between(start, at(2024, 4, 1, 9, 0, 30)), 1);
        assert_eq!(minutes_between(start, at(2024, 4, 1, 8, 0, 0)), 0);
    }

    #[test]
    fn elapsed_minutes_truncates() {
        let from = at(2024, 4, 1, 9, 0, 0);
        assert_eq!(elapsed_minutes(from, at(2024, 4, 1, 9, 1, 59)), 1);
        assert_eq!(elapsed_minutes(from, at(2024, 4, 1, 8, 0, 0)), 0);
    }

    #[test]
    fn parse_accepts_rfc3339_and_plain_dates() {
        assert_eq!(
            parse_instant("2024-04-01T09:00:00+09:00"),
            Some(at(2024, 4, 1, 0, 0, 0))
        );
        assert_eq!(parse_instant("2024-04-01"), Some(at(2024, 4, 1, 0, 0, 0)));
        assert_eq!(parse_instant("yesterday"), None);
    }

    #[test]
    fn week_starts_on_monday() {
        let sunday = NaiveDate::from_ymd_opt(2024, 4, 7).unwrap();
        let monday = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        assert_eq!(week_start(sunday), monday);
        assert_eq!(week_start(monday), monday);
    }

    #[test]
    fn inclusive_day_list() {
        let first = NaiveDate::from_ymd_opt(2024, 2, 27).unwrap();
        let last = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(days_inclusive(first, last).len(), 4);
        assert!(days_inclusive(last, first).is_empty());
    }
}
