use sqlx::PgPool;
use uuid::Uuid;

use super::contest::{CONTEST_COLUMNS, ContestRow};
use super::rating_history::HISTORY_COLUMNS;
use super::user::USER_COLUMNS;
use crate::error::{Result, StorageError};
use crate::models::{Contest, ContestStatus, RatingHistoryEntry, User};
use crate::store::{CommittedFinalization, FinalizationCommit};

/// Writes a finalization inside one transaction.
///
/// Every update is conditional on the state the batch was computed from; the
/// transaction is rolled back as soon as one condition does not hold. Rows
/// are written in `user_id` order so that concurrent finalizations sharing
/// users lock them in the same order.
pub struct FinalizationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FinalizationRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn commit(&self, commit: &FinalizationCommit) -> Result<CommittedFinalization> {
        self.write(commit).await.map_err(|e| {
            if e.is_concurrency_abort() {
                StorageError::StaleSnapshot(format!(
                    "contest {} lost to a concurrent finalization: {e}",
                    commit.contest_id
                ))
            } else {
                e
            }
        })
    }

    async fn write(&self, commit: &FinalizationCommit) -> Result<CommittedFinalization> {
        let mut tx = self.pool.begin().await?;

        let closed = sqlx::query_as::<_, ContestRow>(&format!(
            r#"
            UPDATE contests
            SET status = $2
            WHERE contest_id = $1 AND status = $3
            RETURNING {CONTEST_COLUMNS}
            "#
        ))
        .bind(commit.contest_id)
        .bind(ContestStatus::Closed.as_str())
        .bind(ContestStatus::Open.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(closed) = closed else {
            tx.rollback().await?;
            return Err(StorageError::StaleSnapshot(format!(
                "contest {} is no longer open",
                commit.contest_id
            )));
        };
        let contest = Contest::try_from(closed)?;

        let mut users: Vec<Option<User>> = vec![None; commit.user_updates.len()];
        for index in lock_order(&commit.user_updates, |u| u.user_id) {
            let update = &commit.user_updates[index];
            let updated = sqlx::query_as::<_, User>(&format!(
                r#"
                UPDATE users
                SET current_rating = $2, max_rating = $3, contests_played = $4
                WHERE user_id = $1 AND contests_played = $5
                RETURNING {USER_COLUMNS}
                "#
            ))
            .bind(update.user_id)
            .bind(update.current_rating)
            .bind(update.max_rating)
            .bind(update.contests_played)
            .bind(update.expected_contests_played)
            .fetch_optional(&mut *tx)
            .await?;

            match updated {
                Some(user) => users[index] = Some(user),
                None => {
                    tx.rollback().await?;
                    return Err(StorageError::StaleSnapshot(format!(
                        "user {} changed since it was read",
                        update.user_id
                    )));
                }
            }
        }

        let mut entries: Vec<Option<RatingHistoryEntry>> = vec![None; commit.entries.len()];
        for index in lock_order(&commit.entries, |e| e.user_id) {
            let entry = &commit.entries[index];
            let written = sqlx::query_as::<_, RatingHistoryEntry>(&format!(
                r#"
                INSERT INTO rating_history (
                    entry_id, user_id, contest_id, old_rating, new_rating,
                    performance_rating, rank, percentile, rating_change
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING {HISTORY_COLUMNS}
                "#
            ))
            .bind(entry.id)
            .bind(entry.user_id)
            .bind(entry.contest_id)
            .bind(entry.old_rating)
            .bind(entry.new_rating)
            .bind(entry.performance_rating)
            .bind(entry.rank)
            .bind(entry.percentile)
            .bind(entry.rating_change())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| StorageError::from(e).unique_as_constraint("Rating history entry already exists"))?;
            entries[index] = Some(written);
        }

        tx.commit().await?;

        Ok(CommittedFinalization {
            contest,
            users: users.into_iter().flatten().collect(),
            entries: entries.into_iter().flatten().collect(),
        })
    }
}

/// Indices of `items` sorted by user id
fn lock_order<T>(items: &[T], user_id: impl Fn(&T) -> Uuid) -> Vec<usize> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&i| user_id(&items[i]));
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_order_is_independent_of_rank_order() {
        let mut ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        ids.sort();
        let (low, mid, high) = (ids[0], ids[1], ids[2]);

        let by_rank = [high, low, mid];
        let reversed = [mid, low, high];

        let first: Vec<Uuid> = lock_order(&by_rank, |id| *id)
            .into_iter()
            .map(|i| by_rank[i])
            .collect();
        let second: Vec<Uuid> = lock_order(&reversed, |id| *id)
            .into_iter()
            .map(|i| reversed[i])
            .collect();

        assert_eq!(first, vec![low, mid, high]);
        assert_eq!(first, second);
        assert_eq!(lock_order(&by_rank, |id| *id), vec![1, 2, 0]);
    }
}
