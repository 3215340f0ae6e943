//! Error types for the account workflows.

use thiserror::Error;

/// Account-merge failures. Every step of the merge surfaces through this one
/// error so callers report a single failure message.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("no pending merge for this account")]
    NoPendingMerge,

    #[error("account merge failed: {0}")]
    Database(String),
}

impl From<sqlx::Error> for MergeError {
    fn from(err: sqlx::Error) -> Self {
        MergeError::Database(err.to_string())
    }
}

/// Account-deletion failures.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("user not found")]
    UserNotFound,

    #[error("account deletion failed: {0}")]
    Database(String),
}

impl From<sqlx::Error> for AccountError {
    fn from(err: sqlx::Error) -> Self {
        AccountError::Database(err.to_string())
    }
}
