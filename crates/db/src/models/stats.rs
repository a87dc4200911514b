//! Narrow occurrence projections feeding the statistics and ranking folds.

use sqlx::FromRow;
use taskwatch_core::ranking::RankingSample;
use taskwatch_core::stats::OccurrenceSample;
use taskwatch_core::status::OccurrenceStatus;
use taskwatch_core::types::{DbId, Timestamp};

#[derive(Debug, Clone, FromRow)]
pub struct OccurrenceSampleRow {
    pub user_id: DbId,
    #[sqlx(rename = "status_id", try_from = "i16")]
    pub status: OccurrenceStatus,
    pub start_at: Timestamp,
    pub end_at: Timestamp,
    pub is_all_day: bool,
}

impl From<OccurrenceSampleRow> for OccurrenceSample {
    fn from(row: OccurrenceSampleRow) -> Self {
        Self {
            status: row.status,
            start_at: row.start_at,
            end_at: row.end_at,
            is_all_day: row.is_all_day,
        }
    }
}

impl From<OccurrenceSampleRow> for RankingSample {
    fn from(row: OccurrenceSampleRow) -> Self {
        Self {
            user_id: row.user_id,
            status: row.status,
            start_at: row.start_at,
            end_at: row.end_at,
        }
    }
}
