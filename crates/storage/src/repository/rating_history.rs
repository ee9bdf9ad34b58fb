use chrono::NaiveDateTime;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::contest::ContestRow;
use crate::error::Result;
use crate::models::{Contest, RatingHistoryEntry, RatingHistoryWithContest};

pub(crate) const HISTORY_COLUMNS: &str = "entry_id AS id, user_id, contest_id, old_rating, \
     new_rating, performance_rating, rank, percentile, rating_change, created_at";

#[derive(FromRow)]
struct HistoryWithContestRow {
    id: Uuid,
    user_id: Uuid,
    contest_id: Uuid,
    old_rating: i32,
    new_rating: i32,
    performance_rating: i32,
    rank: i32,
    percentile: f64,
    rating_change: i32,
    created_at: NaiveDateTime,
    contest_name: String,
    contest_date: NaiveDateTime,
    contest_total_participants: i32,
    contest_status: String,
    contest_created_at: NaiveDateTime,
}

impl TryFrom<HistoryWithContestRow> for RatingHistoryWithContest {
    type Error = crate::error::StorageError;

    fn try_from(row: HistoryWithContestRow) -> Result<Self> {
        let contest = Contest::try_from(ContestRow {
            id: row.contest_id,
            name: row.contest_name,
            date: row.contest_date,
            total_participants: row.contest_total_participants,
            status: row.contest_status,
            created_at: row.contest_created_at,
        })?;

        Ok(RatingHistoryWithContest {
            entry: RatingHistoryEntry {
                id: row.id,
                user_id: row.user_id,
                contest_id: row.contest_id,
                old_rating: row.old_rating,
                new_rating: row.new_rating,
                performance_rating: row.performance_rating,
                rank: row.rank,
                percentile: row.percentile,
                rating_change: row.rating_change,
                created_at: row.created_at,
            },
            contest,
        })
    }
}

/// Read access to the append-only rating history
pub struct RatingHistoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RatingHistoryRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// History of a user joined with contest data, oldest contest first
    pub async fn for_user(&self, user_id: Uuid) -> Result<Vec<RatingHistoryWithContest>> {
        let rows = sqlx::query_as::<_, HistoryWithContestRow>(
            r#"
            SELECT
                h.entry_id AS id,
                h.user_id,
                h.contest_id,
                h.old_rating,
                h.new_rating,
                h.performance_rating,
                h.rank,
                h.percentile,
                h.rating_change,
                h.created_at,
                c.name AS contest_name,
                c.date AS contest_date,
                c.total_participants AS contest_total_participants,
                c.status AS contest_status,
                c.created_at AS contest_created_at
            FROM rating_history h
            JOIN contests c ON h.contest_id = c.contest_id
            WHERE h.user_id = $1
            ORDER BY c.date ASC, h.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(RatingHistoryWithContest::try_from)
            .collect()
    }

    /// Entries written for a contest, ordered by rank
    pub async fn for_contest(&self, contest_id: Uuid) -> Result<Vec<RatingHistoryEntry>> {
        let entries = sqlx::query_as::<_, RatingHistoryEntry>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM rating_history WHERE contest_id = $1 ORDER BY rank"
        ))
        .bind(contest_id)
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }
}
