//! Friend-group leaderboards.
//!
//! Every participant (the caller plus accepted friends) is scored on one
//! metric over a calendar period. Ordering is a stable descending sort so
//! ties keep the order of the participant list.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::Serialize;

use crate::error::CoreError;
use crate::stats::longest_streak;
use crate::status::OccurrenceStatus;
use crate::time::{date_start, minutes_between, week_start};
use crate::types::{DbId, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalMinutes,
    CompletionRate,
    Streak,
}

impl Metric {
    pub fn parse(raw: Option<&str>) -> Result<Self, CoreError> {
        match raw.map(str::trim) {
            None | Some("total_minutes") => Ok(Self::TotalMinutes),
            Some("completion_rate") => Ok(Self::CompletionRate),
            Some("streak") => Ok(Self::Streak),
            Some(_) => Err(invalid_parameters()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Weekly,
    Monthly,
}

impl Period {
    pub fn parse(raw: Option<&str>) -> Result<Self, CoreError> {
        match raw.map(str::trim) {
            None | Some("weekly") => Ok(Self::Weekly),
            Some("monthly") => Ok(Self::Monthly),
            Some(_) => Err(invalid_parameters()),
        }
    }

    /// Half-open UTC range `[start, end)` of the period containing `now`.
    pub fn range(self, now: Timestamp) -> RankingRange {
        let today = now.date_naive();
        let (first, next) = match self {
            Self::Weekly => {
                let monday = week_start(today);
                (monday, monday + Days::new(7))
            }
            Self::Monthly => {
                let first = today.with_day(1).unwrap_or(today);
                (first, first + Months::new(1))
            }
        };
        RankingRange {
            start: date_start(first),
            end: date_start(next),
        }
    }
}

fn invalid_parameters() -> CoreError {
    CoreError::invalid(
        "INVALID_PARAMETERS",
        "metric must be total_minutes, completion_rate or streak; period must be weekly or monthly.",
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankingRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl RankingRange {
    fn first_day(&self) -> NaiveDate {
        self.start.date_naive()
    }

    fn last_day(&self) -> NaiveDate {
        self.end.date_naive().pred_opt().unwrap_or(self.end.date_naive())
    }
}

/// One occurrence of a participant inside the ranking range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankingSample {
    pub user_id: DbId,
    pub status: OccurrenceStatus,
    pub start_at: Timestamp,
    pub end_at: Timestamp,
}

/// A leaderboard participant, in friend-list order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub id: DbId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RankingValue {
    Count(i64),
    Ratio(f64),
}

impl RankingValue {
    fn sort_key(value: Option<Self>) -> f64 {
        match value {
            Some(Self::Count(n)) => n as f64,
            Some(Self::Ratio(r)) => r,
            None => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionExtra {
    pub done_count: i64,
    pub missed_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub rank: usize,
    pub user: Participant,
    pub value: Option<RankingValue>,
    pub display_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<CompletionExtra>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    pub metric: Metric,
    pub period: Period,
    pub range: RankingRange,
    pub rankings: Vec<RankingEntry>,
}

#[derive(Debug, Default)]
struct Tally {
    total_minutes: i64,
    done: i64,
    missed: i64,
    done_days: HashSet<NaiveDate>,
}

/// Score `participants` on `metric` using the samples that fall inside `range`.
pub fn build_leaderboard(
    metric: Metric,
    period: Period,
    range: RankingRange,
    participants: Vec<Participant>,
    samples: &[RankingSample],
) -> Leaderboard {
    let mut tallies: HashMap<DbId, Tally> = HashMap::new();
    for sample in samples
        .iter()
        .filter(|s| s.start_at >= range.start && s.start_at < range.end)
    {
        let tally = tallies.entry(sample.user_id).or_default();
        match sample.status {
            OccurrenceStatus::Done => {
                tally.done += 1;
                tally.total_minutes += minutes_between(sample.start_at, sample.end_at);
                tally.done_days.insert(sample.start_at.date_naive());
            }
            OccurrenceStatus::Missed => tally.missed += 1,
            OccurrenceStatus::Scheduled => {}
        }
    }

    let empty = Tally::default();
    let mut rankings: Vec<RankingEntry> = participants
        .into_iter()
        .map(|user| {
            let tally = tallies.get(&user.id).unwrap_or(&empty);
            score(metric, &range, tally, user)
        })
        .collect();

    rankings.sort_by(|a, b| {
        RankingValue::sort_key(b.value).total_cmp(&RankingValue::sort_key(a.value))
    });
    for (index, entry) in rankings.iter_mut().enumerate() {
        entry.rank = index + 1;
    }

    Leaderboard {
        metric,
        period,
        range,
        rankings,
    }
}

fn score(metric: Metric, range: &RankingRange, tally: &Tally, user: Participant) -> RankingEntry {
    let (value, display_value, extra) = match metric {
        Metric::TotalMinutes => (
            Some(RankingValue::Count(tally.total_minutes)),
            format!("{} min", tally.total_minutes),
            None,
        ),
        Metric::CompletionRate => {
            let evaluated = tally.done + tally.missed;
            let ratio = (evaluated > 0).then(|| tally.done as f64 / evaluated as f64);
            let display = match ratio {
                Some(r) => format!("{}%", (r * 1000.0).round() / 10.0),
                None => "-".to_string(),
            };
            (
                ratio.map(RankingValue::Ratio),
                display,
                Some(CompletionExtra {
                    done_count: tally.done,
                    missed_count: tally.missed,
                }),
            )
        }
        Metric::Streak => {
            let streak = longest_streak(&tally.done_days, range.first_day(), range.last_day());
            (
                Some(RankingValue::Count(i64::from(streak))),
                format!("{streak} days"),
                None,
            )
        }
    };

    RankingEntry {
        rank: 0,
        user,
        value,
        display_value,
        extra,
    }
}
