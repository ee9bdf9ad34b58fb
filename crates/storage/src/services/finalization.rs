//! Contest finalization: turns a final ranking into committed rating updates.
//!
//! Every participant is rated from one snapshot of the field taken before any
//! computation starts, so no participant's new rating can leak into another's
//! within the same batch. All writes go to storage as a single commit.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::lifecycle::{ContestLifecycle, InFlightContests};
use super::rating_engine::{ComputationError, RatingEngine, RatingInput, RatingOutcome};
use crate::dto::contest::ContestResult;
use crate::error::StorageError;
use crate::models::{Contest, NewRatingHistoryEntry, RatingHistoryEntry, User};
use crate::store::{FinalizationCommit, RatingStore, UserRatingUpdate};

#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rating computation failed: {0}")]
    Computation(#[from] ComputationError),

    #[error("persistence failure: {0}")]
    Persistence(#[source] StorageError),
}

impl FinalizeError {
    /// Nothing was committed and the same request may succeed later
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Conflict(_) => true,
            Self::Persistence(e) => e.is_transient(),
            Self::Validation(_) | Self::NotFound(_) | Self::Computation(_) => false,
        }
    }
}

impl From<StorageError> for FinalizeError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::StaleSnapshot(msg) => Self::Conflict(msg),
            StorageError::ConstraintViolation(msg) => Self::Conflict(msg),
            other if other.is_concurrency_abort() => Self::Conflict(other.to_string()),
            other => Self::Persistence(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantOutcome {
    pub user: User,
    pub entry: RatingHistoryEntry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeOutcome {
    pub contest: Contest,
    pub participants: Vec<ParticipantOutcome>,
}

/// Result of rating one participant without committing it
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantPreview {
    pub user: User,
    pub rank: i32,
    pub outcome: RatingOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProcessorConfig {
    /// Upper bound for each storage call of a finalize
    pub storage_timeout: Duration,
}

impl Default for BatchProcessorConfig {
    fn default() -> Self {
        Self {
            storage_timeout: Duration::from_secs(5),
        }
    }
}

/// Single mutating entry point for ratings
#[derive(Clone)]
pub struct BatchProcessor {
    store: Arc<dyn RatingStore>,
    engine: RatingEngine,
    in_flight: InFlightContests,
    config: BatchProcessorConfig,
}

impl BatchProcessor {
    pub fn new(store: Arc<dyn RatingStore>, engine: RatingEngine, config: BatchProcessorConfig) -> Self {
        Self {
            store,
            engine,
            in_flight: InFlightContests::new(),
            config,
        }
    }

    /// Close `contest_id` with the given ranking and commit every rating change.
    ///
    /// On any error the contest stays open and no user or history row changes.
    pub async fn finalize(
        &self,
        contest_id: Uuid,
        results: &[ContestResult],
    ) -> Result<FinalizeOutcome, FinalizeError> {
        let _guard = self.in_flight.try_acquire(contest_id).map_err(|e| {
            warn!(%contest_id, "Rejected concurrent finalization");
            FinalizeError::Conflict(e.to_string())
        })?;

        let contest = self.load_open_contest(contest_id).await?;
        validate_results(&contest, results).inspect_err(|e| {
            warn!(%contest_id, error = %e, "Rejected contest results");
        })?;
        let snapshot = self.snapshot(results).await?;

        let mut lifecycle = ContestLifecycle::from_status(contest.id, contest.status);
        lifecycle
            .begin_closing()
            .map_err(|e| FinalizeError::Conflict(e.to_string()))?;

        info!(
            %contest_id,
            participants = results.len(),
            total_participants = contest.total_participants,
            "Finalizing contest"
        );

        match self.compute_and_commit(&contest, results, &snapshot).await {
            Ok(outcome) => {
                // The commit already closed the contest, so a refused
                // transition is only worth a log line
                if let Err(e) = lifecycle.complete() {
                    warn!(%contest_id, error = %e, "Lifecycle out of step with committed state");
                }
                info!(%contest_id, "Contest closed");
                Ok(outcome)
            }
            Err(e) => {
                let status = lifecycle.fail().ok();
                match &e {
                    FinalizeError::Computation(_) | FinalizeError::Persistence(_) => {
                        error!(%contest_id, ?status, error = %e, "Contest finalization aborted");
                    }
                    _ => warn!(%contest_id, ?status, error = %e, "Contest finalization aborted"),
                }
                Err(e)
            }
        }
    }

    /// Same validation and computation as `finalize`, without writing anything
    pub async fn preview(
        &self,
        contest_id: Uuid,
        results: &[ContestResult],
    ) -> Result<Vec<ParticipantPreview>, FinalizeError> {
        let contest = self.load_open_contest(contest_id).await?;
        validate_results(&contest, results)?;
        let snapshot = self.snapshot(results).await?;

        let outcomes = self.compute(&contest, results, &snapshot)?;
        Ok(results
            .iter()
            .zip(outcomes)
            .filter_map(|(result, outcome)| {
                snapshot.get(&result.user_id).map(|user| ParticipantPreview {
                    user: user.clone(),
                    rank: result.rank,
                    outcome,
                })
            })
            .collect())
    }

    async fn load_open_contest(&self, contest_id: Uuid) -> Result<Contest, FinalizeError> {
        let contest = self
            .with_timeout(self.store.find_contest(contest_id))
            .await
            .map_err(|e| match e {
                StorageError::NotFound => FinalizeError::NotFound(format!("contest {contest_id}")),
                other => FinalizeError::Persistence(other),
            })?;

        if !contest.is_open() {
            return Err(FinalizeError::Conflict(format!(
                "contest {contest_id} is already {}",
                contest.status
            )));
        }

        Ok(contest)
    }

    /// One consistent read of every listed user
    async fn snapshot(&self, results: &[ContestResult]) -> Result<HashMap<Uuid, User>, FinalizeError> {
        let ids: Vec<Uuid> = results.iter().map(|r| r.user_id).collect();
        let users = self
            .with_timeout(self.store.snapshot_users(&ids))
            .await
            .map_err(FinalizeError::Persistence)?;

        let snapshot: HashMap<Uuid, User> = users.into_iter().map(|u| (u.id, u)).collect();
        if let Some(missing) = ids.iter().find(|id| !snapshot.contains_key(id)) {
            return Err(FinalizeError::NotFound(format!("user {missing}")));
        }

        Ok(snapshot)
    }

    /// Rate every participant from the snapshot, in input order
    fn compute(
        &self,
        contest: &Contest,
        results: &[ContestResult],
        snapshot: &HashMap<Uuid, User>,
    ) -> Result<Vec<RatingOutcome>, FinalizeError> {
        let engine = &self.engine;
        let outcomes = results
            .par_iter()
            .map(|result| {
                let user = snapshot.get(&result.user_id).ok_or_else(|| {
                    ComputationError::InvalidInput(format!(
                        "user {} missing from snapshot",
                        result.user_id
                    ))
                })?;
                engine.compute(&RatingInput {
                    rank: result.rank,
                    total_participants: contest.total_participants,
                    old_rating: user.current_rating,
                    contests_played: user.contests_played,
                })
            })
            .collect::<Result<Vec<_>, ComputationError>>()?;

        Ok(outcomes)
    }

    async fn compute_and_commit(
        &self,
        contest: &Contest,
        results: &[ContestResult],
        snapshot: &HashMap<Uuid, User>,
    ) -> Result<FinalizeOutcome, FinalizeError> {
        let outcomes = self.compute(contest, results, snapshot)?;
        let commit = build_commit(contest.id, results, snapshot, &outcomes);

        let committed = self
            .with_timeout(self.store.commit_finalization(&commit))
            .await?;

        let participants = committed
            .users
            .into_iter()
            .zip(committed.entries)
            .map(|(user, entry)| ParticipantOutcome { user, entry })
            .collect();

        Ok(FinalizeOutcome {
            contest: committed.contest,
            participants,
        })
    }

    async fn with_timeout<T>(
        &self,
        operation: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, StorageError> {
        let limit = self.config.storage_timeout;
        tokio::time::timeout(limit, operation)
            .await
            .map_err(|_| StorageError::Timeout(limit))?
    }
}

fn validate_results(contest: &Contest, results: &[ContestResult]) -> Result<(), FinalizeError> {
    if results.is_empty() {
        return Err(FinalizeError::Validation(
            "at least one result is required".to_string(),
        ));
    }

    let total = contest.total_participants;
    if results.len() > total as usize {
        return Err(FinalizeError::Validation(format!(
            "{} results submitted for a contest of {total} participants",
            results.len()
        )));
    }

    let mut users = HashSet::with_capacity(results.len());
    let mut ranks = HashSet::with_capacity(results.len());
    for result in results {
        if !users.insert(result.user_id) {
            return Err(FinalizeError::Validation(format!(
                "user {} appears more than once",
                result.user_id
            )));
        }
        if result.rank < 1 || result.rank > total {
            return Err(FinalizeError::Validation(format!(
                "rank {} for user {} is outside 1..={total}",
                result.rank, result.user_id
            )));
        }
        if !ranks.insert(result.rank) {
            return Err(FinalizeError::Validation(format!(
                "rank {} is assigned more than once",
                result.rank
            )));
        }
    }

    Ok(())
}

fn build_commit(
    contest_id: Uuid,
    results: &[ContestResult],
    snapshot: &HashMap<Uuid, User>,
    outcomes: &[RatingOutcome],
) -> FinalizationCommit {
    let mut user_updates = Vec::with_capacity(results.len());
    let mut entries = Vec::with_capacity(results.len());

    for (result, outcome) in results.iter().zip(outcomes) {
        let Some(user) = snapshot.get(&result.user_id) else {
            continue;
        };

        user_updates.push(UserRatingUpdate {
            user_id: user.id,
            expected_contests_played: user.contests_played,
            current_rating: outcome.new_rating,
            max_rating: user.max_rating.max(outcome.new_rating),
            contests_played: user.contests_played + 1,
        });
        entries.push(NewRatingHistoryEntry {
            id: Uuid::new_v4(),
            user_id: user.id,
            contest_id,
            old_rating: outcome.old_rating,
            new_rating: outcome.new_rating,
            performance_rating: outcome.performance_rating,
            rank: result.rank,
            percentile: outcome.percentile,
        });
    }

    FinalizationCommit {
        contest_id,
        user_updates,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContestStatus;

    fn contest(total_participants: i32) -> Contest {
        let now = chrono::Utc::now().naive_utc();
        Contest {
            id: Uuid::new_v4(),
            name: "Round".to_string(),
            date: now,
            total_participants,
            status: ContestStatus::Open,
            created_at: now,
        }
    }

    fn result(rank: i32) -> ContestResult {
        ContestResult {
            user_id: Uuid::new_v4(),
            rank,
        }
    }

    #[test]
    fn test_partial_field_is_accepted() {
        let contest = contest(10);
        assert!(validate_results(&contest, &[result(3), result(7)]).is_ok());
    }

    #[test]
    fn test_duplicate_rank_is_rejected() {
        let contest = contest(10);
        let err = validate_results(&contest, &[result(2), result(2)]).unwrap_err();
        assert!(matches!(err, FinalizeError::Validation(msg) if msg.contains("rank 2")));
    }

    #[test]
    fn test_more_results_than_participants_is_rejected() {
        let contest = contest(1);
        let err = validate_results(&contest, &[result(1), result(1)]).unwrap_err();
        assert!(matches!(err, FinalizeError::Validation(_)));
    }

    #[test]
    fn test_zero_rank_is_rejected() {
        let contest = contest(5);
        assert!(matches!(
            validate_results(&contest, &[result(0)]),
            Err(FinalizeError::Validation(_))
        ));
    }

    #[test]
    fn test_build_commit_tracks_max_rating_and_count() {
        let contest = contest(10);
        let user = User {
            id: Uuid::new_v4(),
            name: "ada".to_string(),
            current_rating: 1500,
            max_rating: 1700,
            contests_played: 3,
            created_at: contest.created_at,
        };
        let results = [ContestResult {
            user_id: user.id,
            rank: 1,
        }];
        let outcomes = [RatingOutcome {
            old_rating: 1500,
            percentile: 0.95,
            performance_rating: 2012,
            new_rating: 1628,
        }];
        let snapshot = HashMap::from([(user.id, user.clone())]);

        let commit = build_commit(contest.id, &results, &snapshot, &outcomes);

        assert_eq!(commit.user_updates[0].max_rating, 1700);
        assert_eq!(commit.user_updates[0].contests_played, 4);
        assert_eq!(commit.user_updates[0].expected_contests_played, 3);
        assert_eq!(commit.entries[0].rating_change(), 128);
    }

    #[test]
    fn test_stale_snapshot_maps_to_conflict() {
        let err = FinalizeError::from(StorageError::StaleSnapshot("user changed".to_string()));
        assert!(matches!(err, FinalizeError::Conflict(_)));
        assert!(err.is_retryable());
        assert!(!FinalizeError::Validation("bad".to_string()).is_retryable());
    }
}
