//! Read/write contract used by the rating services.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Contest, NewRatingHistoryEntry, RatingHistoryEntry, RatingHistoryWithContest, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub initial_rating: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContest {
    pub id: Uuid,
    pub name: String,
    pub date: NaiveDateTime,
    pub total_participants: i32,
}

/// New rating state for one user, valid only if the user still has
/// `expected_contests_played` when the commit runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserRatingUpdate {
    pub user_id: Uuid,
    pub expected_contests_played: i32,
    pub current_rating: i32,
    pub max_rating: i32,
    pub contests_played: i32,
}

/// Every write produced by one contest finalization
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizationCommit {
    pub contest_id: Uuid,
    pub user_updates: Vec<UserRatingUpdate>,
    pub entries: Vec<NewRatingHistoryEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommittedFinalization {
    pub contest: Contest,
    pub users: Vec<User>,
    pub entries: Vec<RatingHistoryEntry>,
}

#[async_trait]
pub trait RatingStore: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>>;

    async fn find_user(&self, id: Uuid) -> Result<User>;

    async fn create_user(&self, user: NewUser) -> Result<User>;

    /// Contests, most recent first
    async fn list_contests(&self) -> Result<Vec<Contest>>;

    async fn find_contest(&self, id: Uuid) -> Result<Contest>;

    async fn create_contest(&self, contest: NewContest) -> Result<Contest>;

    /// Read every listed user at one consistent point in time. Unknown ids are
    /// omitted from the result rather than reported as errors.
    async fn snapshot_users(&self, ids: &[Uuid]) -> Result<Vec<User>>;

    /// A user's history joined with its contests, oldest contest first
    async fn user_history(&self, user_id: Uuid) -> Result<Vec<RatingHistoryWithContest>>;

    /// History rows written for a contest, ordered by rank
    async fn contest_results(&self, contest_id: Uuid) -> Result<Vec<RatingHistoryEntry>>;

    /// Apply all writes of a finalization or none of them.
    ///
    /// Fails with `StaleSnapshot` if the contest is no longer open or any user
    /// changed since the snapshot was taken.
    async fn commit_finalization(&self, commit: &FinalizationCommit) -> Result<CommittedFinalization>;
}
