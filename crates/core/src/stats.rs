//! Experience points, levels, streaks and the weekly "my page" report.
//!
//! XP is a left fold over a user's occurrence history in chronological
//! order: every DONE occurrence adds its minutes times the per-minute rate,
//! every MISSED occurrence subtracts a flat penalty, and the running total
//! is clamped at zero after each step.

use std::collections::{BTreeMap, HashSet};

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::error::CoreError;
use crate::status::OccurrenceStatus;
use crate::time::{date_start, days_inclusive, minutes_between, week_start};
use crate::types::Timestamp;

pub const DEFAULT_XP_PER_MINUTE: i64 = 2;
pub const DEFAULT_XP_PENALTY_MISSED: i64 = 20;
pub const DEFAULT_LEVEL_STEP: i64 = 500;
/// Minutes credited for a completed all-day occurrence.
pub const DEFAULT_ALL_DAY_MINUTES: i64 = 60;

/// Tunable XP parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsConfig {
    pub xp_per_minute: i64,
    pub miss_penalty: i64,
    pub level_step: i64,
    pub all_day_minutes: i64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            xp_per_minute: DEFAULT_XP_PER_MINUTE,
            miss_penalty: DEFAULT_XP_PENALTY_MISSED,
            level_step: DEFAULT_LEVEL_STEP,
            all_day_minutes: DEFAULT_ALL_DAY_MINUTES,
        }
    }
}

/// The slice of an occurrence the statistics need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccurrenceSample {
    pub status: OccurrenceStatus,
    pub start_at: Timestamp,
    pub end_at: Timestamp,
    pub is_all_day: bool,
}

impl OccurrenceSample {
    /// Wall-clock minutes of the occurrence.
    pub fn minutes(&self) -> i64 {
        minutes_between(self.start_at, self.end_at)
    }

    /// UTC calendar day the occurrence starts on.
    pub fn day(&self) -> NaiveDate {
        self.start_at.date_naive()
    }
}

// ---------------------------------------------------------------------------
// XP and level
// ---------------------------------------------------------------------------

/// Total XP for `samples`, which must be in chronological order.
pub fn compute_xp(samples: &[OccurrenceSample], config: &StatsConfig) -> i64 {
    samples.iter().fold(0, |xp, sample| match sample.status {
        OccurrenceStatus::Done => {
            let minutes = if sample.is_all_day {
                config.all_day_minutes
            } else {
                sample.minutes()
            };
            xp + minutes * config.xp_per_minute
        }
        OccurrenceStatus::Missed => (xp - config.miss_penalty).max(0),
        OccurrenceStatus::Scheduled => xp,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelSnapshot {
    pub level: i64,
    pub total_xp: i64,
    pub xp_for_current_level: i64,
    pub xp_for_next_level: i64,
    pub xp_to_next_level: i64,
    /// Fraction of the current level completed, in `[0, 1]`.
    pub level_progress: f64,
}

pub fn compute_level(total_xp: i64, config: &StatsConfig) -> LevelSnapshot {
    let xp = total_xp.max(0);
    let step = config.level_step.max(1);
    let level = xp / step + 1;
    let xp_for_current_level = (level - 1) * step;
    let xp_for_next_level = level * step;
    let level_progress = ((xp - xp_for_current_level) as f64 / step as f64).clamp(0.0, 1.0);

    LevelSnapshot {
        level,
        total_xp: xp,
        xp_for_current_level,
        xp_for_next_level,
        xp_to_next_level: xp_for_next_level - xp,
        level_progress,
    }
}

// ---------------------------------------------------------------------------
// Streaks
// ---------------------------------------------------------------------------

/// Consecutive days ending at `today` that contain a DONE occurrence.
///
/// A day without completions immediately before `today` (or `today` itself)
/// ends the count.
pub fn current_streak(done_days: &HashSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut cursor = Some(today);
    while let Some(day) = cursor.filter(|d| done_days.contains(d)) {
        streak += 1;
        cursor = day.pred_opt();
    }
    streak
}

/// Longest run of consecutive DONE days in `[first, last]`.
pub fn longest_streak(done_days: &HashSet<NaiveDate>, first: NaiveDate, last: NaiveDate) -> u32 {
    let mut longest = 0;
    let mut current = 0;
    for day in days_inclusive(first, last) {
        if done_days.contains(&day) {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

// ---------------------------------------------------------------------------
// Weekly report
// ---------------------------------------------------------------------------

/// Parse `week_start` (`YYYY-MM-DD`) and snap it to its Monday.
/// Absent means the current week.
pub fn parse_week_start(raw: Option<&str>, today: NaiveDate) -> Result<NaiveDate, CoreError> {
    let Some(raw) = raw else {
        return Ok(week_start(today));
    };
    let raw = raw.trim();
    let well_formed = raw.len() == 10
        && raw
            .char_indices()
            .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });
    if !well_formed {
        return Err(invalid_week_start());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(week_start)
        .map_err(|_| invalid_week_start())
}

fn invalid_week_start() -> CoreError {
    CoreError::invalid(
        "INVALID_WEEK_START",
        "week_start must be formatted as YYYY-MM-DD.",
    )
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayTotals {
    pub date: NaiveDate,
    pub planned_minutes: i64,
    pub completed_minutes: i64,
    pub done_count: i64,
    pub missed_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySummary {
    #[serde(flatten)]
    pub level: LevelSnapshot,
    pub streak_count: u32,
    /// `done / (done + missed)` for the week, `None` when nothing was evaluated.
    pub completion_rate: Option<f64>,
    pub weekly_done: i64,
    pub weekly_missed: i64,
    pub completed_minutes_week: i64,
    pub completed_minutes_previous_week: i64,
    pub xp_per_minute: i64,
    pub xp_penalty_missed: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekNavigation {
    pub prev_week_start: NaiveDate,
    /// `None` once the following week would be in the future.
    pub next_week_start: Option<NaiveDate>,
    pub is_current_week: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyReport {
    pub period: Period,
    pub weekly_totals: Vec<DayTotals>,
    pub summary: WeeklySummary,
    pub navigation: WeekNavigation,
}

/// Build the report for the Monday-start week `monday`.
///
/// `samples` is the user's complete history in chronological order; XP and
/// the streak are all-time, everything else is scoped to the week.
pub fn weekly_report(
    samples: &[OccurrenceSample],
    monday: NaiveDate,
    now: Timestamp,
    config: &StatsConfig,
) -> WeeklyReport {
    let week_begin = date_start(monday);
    let week_end = date_start(monday + Days::new(7));
    let prev_begin = date_start(monday - Days::new(7));

    let mut days: BTreeMap<NaiveDate, DayTotals> = (0..7)
        .map(|offset| {
            let date = monday + Days::new(offset);
            (
                date,
                DayTotals {
                    date,
                    ..Default::default()
                },
            )
        })
        .collect();

    let mut done_days = HashSet::new();
    let mut weekly_done = 0;
    let mut weekly_missed = 0;
    let mut completed_week = 0;
    let mut completed_prev = 0;

    for sample in samples {
        let minutes = sample.minutes();
        let in_week = sample.start_at >= week_begin && sample.start_at < week_end;
        let in_prev = sample.start_at >= prev_begin && sample.start_at < week_begin;

        if in_week {
            if let Some(bucket) = days.get_mut(&sample.day()) {
                bucket.planned_minutes += minutes;
                match sample.status {
                    OccurrenceStatus::Done => {
                        bucket.completed_minutes += minutes;
                        bucket.done_count += 1;
                    }
                    OccurrenceStatus::Missed => bucket.missed_count += 1,
                    OccurrenceStatus::Scheduled => {}
                }
            }
            match sample.status {
                OccurrenceStatus::Done => {
                    weekly_done += 1;
                    completed_week += minutes;
                }
                OccurrenceStatus::Missed => weekly_missed += 1,
                OccurrenceStatus::Scheduled => {}
            }
        }

        if sample.status == OccurrenceStatus::Done {
            if in_prev {
                completed_prev += minutes;
            }
            done_days.insert(sample.day());
        }
    }

    let evaluated = weekly_done + weekly_missed;
    let completion_rate = (evaluated > 0).then(|| weekly_done as f64 / evaluated as f64);

    let current_monday = week_start(now.date_naive());
    let next_monday = monday + Days::new(7);

    WeeklyReport {
        period: Period {
            start: monday,
            end: monday + Days::new(6),
        },
        weekly_totals: days.into_values().collect(),
        summary: WeeklySummary {
            level: compute_level(compute_xp(samples, config), config),
            streak_count: current_streak(&done_days, now.date_naive()),
            completion_rate,
            weekly_done,
            weekly_missed,
            completed_minutes_week: completed_week,
            completed_minutes_previous_week: completed_prev,
            xp_per_minute: config.xp_per_minute,
            xp_penalty_missed: config.miss_penalty,
        },
        navigation: WeekNavigation {
            prev_week_start: monday - Days::new(7),
            next_week_start: (next_monday <= current_monday).then_some(next_monday),
            is_current_week: monday == current_monday,
        },
    }
}
