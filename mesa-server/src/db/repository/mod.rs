//! Repository Module
//!
//! CRUD over the SQLite tables. Repositories are free functions taking
//! `&SqlitePool` (or an open transaction where the caller owns atomicity).

pub mod bill;
pub mod catalog;
pub mod dining_table;
pub mod order;
pub mod reservation;
pub mod revoked_token;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
