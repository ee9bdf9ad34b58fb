use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::Contest;

/// One participant's rating change for one finalized contest.
///
/// Rows are append-only: they are written once by contest finalization and
/// never updated. A user's `contests_played` equals the number of rows they own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RatingHistoryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub contest_id: Uuid,
    pub old_rating: i32,
    pub new_rating: i32,
    pub performance_rating: i32,
    pub rank: i32,
    pub percentile: f64,
    pub rating_change: i32,
    pub created_at: chrono::NaiveDateTime,
}

/// History row prepared by finalization, not yet written
#[derive(Debug, Clone, PartialEq)]
pub struct NewRatingHistoryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub contest_id: Uuid,
    pub old_rating: i32,
    pub new_rating: i32,
    pub performance_rating: i32,
    pub rank: i32,
    pub percentile: f64,
}

impl NewRatingHistoryEntry {
    pub fn rating_change(&self) -> i32 {
        self.new_rating - self.old_rating
    }

    pub fn into_entry(self, created_at: chrono::NaiveDateTime) -> RatingHistoryEntry {
        RatingHistoryEntry {
            rating_change: self.rating_change(),
            id: self.id,
            user_id: self.user_id,
            contest_id: self.contest_id,
            old_rating: self.old_rating,
            new_rating: self.new_rating,
            performance_rating: self.performance_rating,
            rank: self.rank,
            percentile: self.percentile,
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatingHistoryWithContest {
    pub entry: RatingHistoryEntry,
    pub contest: Contest,
}
