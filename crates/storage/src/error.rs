use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A conditional write found the row changed since it was read
    #[error("Stale snapshot: {0}")]
    StaleSnapshot(String),

    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    fn sqlstate(&self) -> Option<String> {
        match self {
            StorageError::Database(sqlx::Error::Database(e)) => e.code().map(|c| c.into_owned()),
            _ => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.sqlstate().as_deref() == Some("23505")
    }

    /// Postgres aborted the transaction because of a concurrent writer:
    /// serialization failure (40001) or deadlock (40P01)
    pub fn is_concurrency_abort(&self) -> bool {
        matches!(self.sqlstate().as_deref(), Some("40001" | "40P01"))
    }

    /// Whether re-running the same operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::Timeout(_) | StorageError::StaleSnapshot(_)
        ) || self.is_concurrency_abort()
            || matches!(
                self,
                StorageError::Database(sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))
            )
    }

    /// Map a unique violation to `ConstraintViolation`, anything else passes through
    pub(crate) fn unique_as_constraint(self, message: &str) -> Self {
        if self.is_unique_violation() {
            StorageError::ConstraintViolation(message.to_string())
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    use sqlx::error::{DatabaseError, ErrorKind};

    #[derive(Debug)]
    struct PgCode(&'static str);

    impl fmt::Display for PgCode {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "sqlstate {}", self.0)
        }
    }

    impl StdError for PgCode {}

    impl DatabaseError for PgCode {
        fn message(&self) -> &str {
            "database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.0))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    fn db_error(code: &'static str) -> StorageError {
        StorageError::Database(sqlx::Error::Database(Box::new(PgCode(code))))
    }

    #[test]
    fn test_deadlock_and_serialization_failure_are_transient() {
        for code in ["40P01", "40001"] {
            let err = db_error(code);
            assert!(err.is_concurrency_abort());
            assert!(err.is_transient());
        }
        assert!(!db_error("23514").is_transient());
    }

    #[test]
    fn test_unique_violation_becomes_constraint_violation() {
        let err = db_error("23505").unique_as_constraint("duplicate");
        assert!(matches!(err, StorageError::ConstraintViolation(msg) if msg == "duplicate"));

        let other = db_error("23503").unique_as_constraint("duplicate");
        assert!(matches!(other, StorageError::Database(_)));
    }
}
