use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use tracing::debug;

/// Error types for the data access layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// A row with the same unique key already exists
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// The row an operation targets does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A conditional update matched no row because the current state differs
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Maps constraint violations reported by the driver onto the domain variants,
    /// leaving every other database error untouched.
    pub(crate) fn from_constraint(err: DbErr, what: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                debug!(%detail, "unique constraint violated for {}", what);
                StoreError::Duplicate(what.to_string())
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                debug!(%detail, "foreign key constraint violated for {}", what);
                StoreError::NotFound(what.to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

/// Type alias for Result with StoreError
pub type Result<T> = std::result::Result<T, StoreError>;
