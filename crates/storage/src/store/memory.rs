use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CommittedFinalization, FinalizationCommit, NewContest, NewUser, RatingStore};
use crate::error::{Result, StorageError};
use crate::models::{
    Contest, ContestStatus, RatingHistoryEntry, RatingHistoryWithContest, User,
};

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    contests: HashMap<Uuid, Contest>,
    history: Vec<RatingHistoryEntry>,
}

/// Process-local store. Every read takes the lock once, so a snapshot is
/// consistent, and a commit checks every precondition before mutating.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

#[async_trait]
impl RatingStore for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn find_user(&self, id: Uuid) -> Result<User> {
        let state = self.state.read().await;
        state.users.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        if state.users.contains_key(&user.id) {
            return Err(StorageError::ConstraintViolation(
                "User id already exists".to_string(),
            ));
        }

        let created = User {
            id: user.id,
            name: user.name,
            current_rating: user.initial_rating,
            max_rating: user.initial_rating,
            contests_played: 0,
            created_at: now(),
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_contests(&self) -> Result<Vec<Contest>> {
        let state = self.state.read().await;
        let mut contests: Vec<Contest> = state.contests.values().cloned().collect();
        contests.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(contests)
    }

    async fn find_contest(&self, id: Uuid) -> Result<Contest> {
        let state = self.state.read().await;
        state.contests.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn create_contest(&self, contest: NewContest) -> Result<Contest> {
        let mut state = self.state.write().await;
        if state.contests.contains_key(&contest.id) {
            return Err(StorageError::ConstraintViolation(
                "Contest id already exists".to_string(),
            ));
        }

        let created = Contest {
            id: contest.id,
            name: contest.name,
            date: contest.date,
            total_participants: contest.total_participants,
            status: ContestStatus::Open,
            created_at: now(),
        };
        state.contests.insert(created.id, created.clone());
        Ok(created)
    }

    async fn snapshot_users(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect())
    }

    async fn user_history(&self, user_id: Uuid) -> Result<Vec<RatingHistoryWithContest>> {
        let state = self.state.read().await;
        let mut rows: Vec<RatingHistoryWithContest> = state
            .history
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .filter_map(|entry| {
                state
                    .contests
                    .get(&entry.contest_id)
                    .map(|contest| RatingHistoryWithContest {
                        entry: entry.clone(),
                        contest: contest.clone(),
                    })
            })
            .collect();
        rows.sort_by(|a, b| {
            a.contest
                .date
                .cmp(&b.contest.date)
                .then(a.entry.created_at.cmp(&b.entry.created_at))
        });
        Ok(rows)
    }

    async fn contest_results(&self, contest_id: Uuid) -> Result<Vec<RatingHistoryEntry>> {
        let state = self.state.read().await;
        let mut rows: Vec<RatingHistoryEntry> = state
            .history
            .iter()
            .filter(|entry| entry.contest_id == contest_id)
            .cloned()
            .collect();
        rows.sort_by_key(|entry| entry.rank);
        Ok(rows)
    }

    async fn commit_finalization(&self, commit: &FinalizationCommit) -> Result<CommittedFinalization> {
        let mut state = self.state.write().await;

        let contest = state
            .contests
            .get(&commit.contest_id)
            .ok_or(StorageError::NotFound)?;
        if contest.status != ContestStatus::Open {
            return Err(StorageError::StaleSnapshot(format!(
                "contest {} is no longer open",
                commit.contest_id
            )));
        }

        for update in &commit.user_updates {
            let user = state
                .users
                .get(&update.user_id)
                .ok_or(StorageError::NotFound)?;
            if user.contests_played != update.expected_contests_played {
                return Err(StorageError::StaleSnapshot(format!(
                    "user {} changed since it was read",
                    update.user_id
                )));
            }
        }

        let existing: HashSet<(Uuid, Uuid)> = state
            .history
            .iter()
            .map(|entry| (entry.user_id, entry.contest_id))
            .collect();
        if commit
            .entries
            .iter()
            .any(|entry| existing.contains(&(entry.user_id, entry.contest_id)))
        {
            return Err(StorageError::ConstraintViolation(
                "Rating history entry already exists".to_string(),
            ));
        }

        // All checks passed, apply.
        let committed_at = now();

        let contest = match state.contests.get_mut(&commit.contest_id) {
            Some(contest) => {
                contest.status = ContestStatus::Closed;
                contest.clone()
            }
            None => return Err(StorageError::NotFound),
        };

        let mut users = Vec::with_capacity(commit.user_updates.len());
        for update in &commit.user_updates {
            if let Some(user) = state.users.get_mut(&update.user_id) {
                user.current_rating = update.current_rating;
                user.max_rating = update.max_rating;
                user.contests_played = update.contests_played;
                users.push(user.clone());
            }
        }

        let entries: Vec<RatingHistoryEntry> = commit
            .entries
            .iter()
            .cloned()
            .map(|entry| entry.into_entry(committed_at))
            .collect();
        state.history.extend(entries.iter().cloned());

        Ok(CommittedFinalization {
            contest,
            users,
            entries,
        })
    }
}
