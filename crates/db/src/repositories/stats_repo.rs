//! Read-only occurrence projections for statistics and rankings.

use sqlx::PgPool;
use taskwatch_core::ranking::RankingSample;
use taskwatch_core::stats::OccurrenceSample;
use taskwatch_core::types::{DbId, Timestamp};

use crate::models::stats::OccurrenceSampleRow;

const SAMPLE_COLUMNS: &str = "user_id, status_id, start_at, end_at, is_all_day";

pub struct StatsRepo;

impl StatsRepo {
    /// The user's whole occurrence history in chronological order.
    pub async fn history(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<OccurrenceSample>, sqlx::Error> {
        let query = format!(
            "SELECT {SAMPLE_COLUMNS} FROM occurrences WHERE user_id = $1 ORDER BY start_at, id"
        );
        let rows = sqlx::query_as::<_, OccurrenceSampleRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Occurrences of `user_ids` starting in `[start, end)`.
    pub async fn range_samples(
        pool: &PgPool,
        user_ids: &[DbId],
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<RankingSample>, sqlx::Error> {
        let query = format!(
            "SELECT {SAMPLE_COLUMNS} FROM occurrences \
             WHERE user_id = ANY($1) AND start_at >= $2 AND start_at < $3 \
             ORDER BY start_at, id"
        );
        let rows = sqlx::query_as::<_, OccurrenceSampleRow>(&query)
            .bind(user_ids)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
