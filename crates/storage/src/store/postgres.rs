use async_trait::async_trait;
use uuid::Uuid;

use super::{CommittedFinalization, FinalizationCommit, NewContest, NewUser, RatingStore};
use crate::Database;
use crate::error::Result;
use crate::models::{Contest, RatingHistoryEntry, RatingHistoryWithContest, User};
use crate::repository::{
    contest::ContestRepository, finalization::FinalizationRepository,
    rating_history::RatingHistoryRepository, user::UserRepository,
};

/// `RatingStore` backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RatingStore for PgStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        UserRepository::new(self.db.pool()).list().await
    }

    async fn find_user(&self, id: Uuid) -> Result<User> {
        UserRepository::new(self.db.pool()).find_by_id(id).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        UserRepository::new(self.db.pool()).create(&user).await
    }

    async fn list_contests(&self) -> Result<Vec<Contest>> {
        ContestRepository::new(self.db.pool()).list().await
    }

    async fn find_contest(&self, id: Uuid) -> Result<Contest> {
        ContestRepository::new(self.db.pool()).find_by_id(id).await
    }

    async fn create_contest(&self, contest: NewContest) -> Result<Contest> {
        ContestRepository::new(self.db.pool()).create(&contest).await
    }

    async fn snapshot_users(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        UserRepository::new(self.db.pool()).snapshot(ids).await
    }

    async fn user_history(&self, user_id: Uuid) -> Result<Vec<RatingHistoryWithContest>> {
        RatingHistoryRepository::new(self.db.pool())
            .for_user(user_id)
            .await
    }

    async fn contest_results(&self, contest_id: Uuid) -> Result<Vec<RatingHistoryEntry>> {
        RatingHistoryRepository::new(self.db.pool())
            .for_contest(contest_id)
            .await
    }

    async fn commit_finalization(&self, commit: &FinalizationCommit) -> Result<CommittedFinalization> {
        FinalizationRepository::new(self.db.pool())
            .commit(commit)
            .await
    }
}
