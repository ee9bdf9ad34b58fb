use chrono::NaiveDateTime;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::{Contest, ContestStatus};
use crate::store::NewContest;

pub(crate) const CONTEST_COLUMNS: &str =
    "contest_id AS id, name, date, total_participants, status, created_at";

/// Raw `contests` row; `status` is stored as text
#[derive(Debug, FromRow)]
pub(crate) struct ContestRow {
    pub id: Uuid,
    pub name: String,
    pub date: NaiveDateTime,
    pub total_participants: i32,
    pub status: String,
    pub created_at: NaiveDateTime,
}

impl TryFrom<ContestRow> for Contest {
    type Error = StorageError;

    fn try_from(row: ContestRow) -> Result<Self> {
        let status: ContestStatus = row
            .status
            .parse()
            .map_err(|e: crate::models::ParseContestStatusError| {
                StorageError::ConstraintViolation(e.to_string())
            })?;

        Ok(Contest {
            id: row.id,
            name: row.name,
            date: row.date,
            total_participants: row.total_participants,
            status,
            created_at: row.created_at,
        })
    }
}

/// Repository for Contest database operations
pub struct ContestRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContestRepository<'a> {
    /// Create a new ContestRepository
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all contests
    pub async fn list(&self) -> Result<Vec<Contest>> {
        let rows = sqlx::query_as::<_, ContestRow>(&format!(
            "SELECT {CONTEST_COLUMNS} FROM contests ORDER BY date DESC, created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Contest::try_from).collect()
    }

    /// Get a contest by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Contest> {
        let row = sqlx::query_as::<_, ContestRow>(&format!(
            "SELECT {CONTEST_COLUMNS} FROM contests WHERE contest_id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Contest::try_from(row)
    }

    /// Create a new contest in the `open` state
    pub async fn create(&self, contest: &NewContest) -> Result<Contest> {
        let row = sqlx::query_as::<_, ContestRow>(&format!(
            r#"
            INSERT INTO contests (contest_id, name, date, total_participants, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CONTEST_COLUMNS}
            "#
        ))
        .bind(contest.id)
        .bind(&contest.name)
        .bind(contest.date)
        .bind(contest.total_participants)
        .bind(ContestStatus::Open.as_str())
        .fetch_one(self.pool)
        .await
        .map_err(|e| StorageError::from(e).unique_as_constraint("Contest id already exists"))?;

        Contest::try_from(row)
    }
}
