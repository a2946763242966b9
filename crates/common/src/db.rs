//! Shared database types for Duet
//!
//! Repository error type plus the timeout guard every store call goes through.

use std::future::Future;
use std::time::Duration;

use crate::error::Error;
use thiserror::Error;

/// Default bound for a single store round trip
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Database-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Record already exists")]
    AlreadyExists,

    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Store did not answer within {0:?}")]
    Timeout(Duration),
}

impl RepositoryError {
    /// True when the underlying error is a unique-constraint violation
    pub fn is_unique_violation(&self) -> bool {
        match self {
            RepositoryError::AlreadyExists => true,
            RepositoryError::Connection(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Error::NotFound("Record not found".to_string()),
            RepositoryError::AlreadyExists => Error::Conflict("Record already exists".to_string()),
            RepositoryError::Connection(
                e @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)),
            ) => Error::StoreUnavailable(e.to_string()),
            RepositoryError::Connection(e) => Error::Database(e),
            RepositoryError::InvalidData(msg) => Error::Validation(msg),
            RepositoryError::Timeout(after) => {
                Error::StoreUnavailable(format!("store timed out after {}ms", after.as_millis()))
            }
        }
    }
}

/// Run a store operation under a deadline.
///
/// Elapsed deadlines become `RepositoryError::Timeout`, which maps to
/// `Error::StoreUnavailable` (503) at the HTTP boundary.
pub async fn bounded<T, F>(timeout: Duration, op: F) -> std::result::Result<T, RepositoryError>
where
    F: Future<Output = std::result::Result<T, RepositoryError>>,
{
    match tokio::time::timeout(timeout, op).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Store call timed out");
            Err(RepositoryError::Timeout(timeout))
        }
    }
}
