use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::models::User;
use crate::store::NewUser;

pub(crate) const USER_COLUMNS: &str =
    "user_id AS id, name, current_rating, max_rating, contests_played, created_at";

/// Repository for User database operations
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all users
    pub async fn list(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY name, user_id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(user)
    }

    /// Read a set of users in a single repeatable-read transaction
    pub async fn snapshot(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = ANY($1)"
        ))
        .bind(ids.to_vec())
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(users)
    }

    /// Create a new user
    pub async fn create(&self, user: &NewUser) -> Result<User> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (user_id, name, current_rating, max_rating, contests_played)
            VALUES ($1, $2, $3, $3, 0)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(user.initial_rating)
        .fetch_one(self.pool)
        .await
        .map_err(|e| StorageError::from(e).unique_as_constraint("User id already exists"))?;

        Ok(created)
    }
}
