#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use storage::dto::contest::ContestResult;
use storage::error::{Result, StorageError};
use storage::models::{Contest, RatingHistoryEntry, RatingHistoryWithContest, User};
use storage::services::{BatchProcessor, BatchProcessorConfig, RatingEngine};
use storage::store::{
    CommittedFinalization, FinalizationCommit, NewContest, NewUser, RatingStore,
};
use storage::MemoryStore;
use tokio::sync::Notify;
use uuid::Uuid;

/// Wraps a `MemoryStore` and injects failures around finalization
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    failing_commits: AtomicUsize,
    commit_delay: Mutex<Option<Duration>>,
    gate: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
    interfering_commit: Mutex<Option<FinalizationCommit>>,
}

impl FaultyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Fail the next `count` commits before they reach the inner store
    pub fn fail_next_commits(&self, count: usize) {
        self.failing_commits.store(count, Ordering::SeqCst);
    }

    pub fn delay_commits(&self, delay: Option<Duration>) {
        *self.commit_delay.lock().unwrap() = delay;
    }

    /// Commits signal `entered` and then wait for `release`
    pub fn hold_commits(&self, entered: Arc<Notify>, release: Arc<Notify>) {
        *self.gate.lock().unwrap() = Some((entered, release));
    }

    /// Apply `commit` to the inner store right after the next snapshot is read
    pub fn interfere_after_snapshot(&self, commit: FinalizationCommit) {
        *self.interfering_commit.lock().unwrap() = Some(commit);
    }
}

#[async_trait]
impl RatingStore for FaultyStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        self.inner.list_users().await
    }

    async fn find_user(&self, id: Uuid) -> Result<User> {
        self.inner.find_user(id).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.inner.create_user(user).await
    }

    async fn list_contests(&self) -> Result<Vec<Contest>> {
        self.inner.list_contests().await
    }

    async fn find_contest(&self, id: Uuid) -> Result<Contest> {
        self.inner.find_contest(id).await
    }

    async fn create_contest(&self, contest: NewContest) -> Result<Contest> {
        self.inner.create_contest(contest).await
    }

    async fn snapshot_users(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        let snapshot = self.inner.snapshot_users(ids).await?;
        let interfering = self.interfering_commit.lock().unwrap().take();
        if let Some(commit) = interfering {
            self.inner.commit_finalization(&commit).await?;
        }
        Ok(snapshot)
    }

    async fn user_history(&self, user_id: Uuid) -> Result<Vec<RatingHistoryWithContest>> {
        self.inner.user_history(user_id).await
    }

    async fn contest_results(&self, contest_id: Uuid) -> Result<Vec<RatingHistoryEntry>> {
        self.inner.contest_results(contest_id).await
    }

    async fn commit_finalization(&self, commit: &FinalizationCommit) -> Result<CommittedFinalization> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some((entered, release)) = gate {
            entered.notify_one();
            release.notified().await;
        }

        let delay = *self.commit_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self.failing_commits.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_commits.store(failing - 1, Ordering::SeqCst);
            return Err(StorageError::Database(sqlx::Error::PoolTimedOut));
        }

        self.inner.commit_finalization(commit).await
    }
}

pub fn processor(store: Arc<dyn RatingStore>) -> BatchProcessor {
    BatchProcessor::new(store, RatingEngine::default(), BatchProcessorConfig::default())
}

pub fn processor_with_timeout(store: Arc<dyn RatingStore>, timeout: Duration) -> BatchProcessor {
    BatchProcessor::new(
        store,
        RatingEngine::default(),
        BatchProcessorConfig {
            storage_timeout: timeout,
        },
    )
}

pub async fn create_user(store: &dyn RatingStore, name: &str) -> User {
    create_user_with_rating(store, name, storage::models::DEFAULT_RATING).await
}

pub async fn create_user_with_rating(store: &dyn RatingStore, name: &str, rating: i32) -> User {
    store
        .create_user(NewUser {
            id: Uuid::new_v4(),
            name: name.to_string(),
            initial_rating: rating,
        })
        .await
        .expect("user created")
}

pub async fn create_contest(store: &dyn RatingStore, name: &str, total_participants: i32) -> Contest {
    store
        .create_contest(NewContest {
            id: Uuid::new_v4(),
            name: name.to_string(),
            date: chrono::Utc::now().naive_utc(),
            total_participants,
        })
        .await
        .expect("contest created")
}

pub fn ranking(users: &[User]) -> Vec<ContestResult> {
    users
        .iter()
        .enumerate()
        .map(|(i, user)| ContestResult {
            user_id: user.id,
            rank: i as i32 + 1,
        })
        .collect()
}
