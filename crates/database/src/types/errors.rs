//! Error types shared across the storage layer.

use thiserror::Error;

/// Infrastructure-level database errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("migration error: {0}")]
    MigrationError(String),
}

/// User-related errors
#[derive(Debug, Error, Clone)]
pub enum UserError {
    #[error("user not found")]
    UserNotFound,

    #[error("email already exists")]
    EmailAlreadyExists,

    #[error("invalid coordinates")]
    InvalidCoordinates,

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("database error: {0}")]
    DatabaseError(String),
}

/// Product-related errors
#[derive(Debug, Error, Clone)]
pub enum ProductError {
    #[error("product not found")]
    ProductNotFound,

    #[error("only the owner may modify a product")]
    NotProductOwner,

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("database error: {0}")]
    DatabaseError(String),
}

/// Exchange-related errors
#[derive(Debug, Error, Clone)]
pub enum ExchangeError {
    #[error("exchange not found")]
    ExchangeNotFound,

    #[error("product not found")]
    ProductNotFound,

    #[error("cannot request an exchange on your own product")]
    OwnProduct,

    #[error("an open exchange for this product already exists")]
    AlreadyRequested,

    #[error("user is not a party to this exchange")]
    NotAParty,

    #[error("only the product owner may do this")]
    NotOwner,

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("review already submitted")]
    AlreadyReviewed,

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("database error: {0}")]
    DatabaseError(String),
}

/// Chat-related errors
#[derive(Debug, Error, Clone)]
pub enum ChatError {
    #[error("chat not found")]
    ChatNotFound,

    #[error("user is not a participant of this chat")]
    NotAParticipant,

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("database error: {0}")]
    DatabaseError(String),
}

/// Notification-related errors
#[derive(Debug, Error, Clone)]
pub enum NotificationError {
    #[error("notification not found")]
    NotificationNotFound,

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("database error: {0}")]
    DatabaseError(String),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
pub type UserResult<T> = Result<T, UserError>;
pub type ProductResult<T> = Result<T, ProductError>;
pub type ExchangeResult<T> = Result<T, ExchangeError>;
pub type ChatResult<T> = Result<T, ChatError>;
pub type NotificationResult<T> = Result<T, NotificationError>;

impl From<sqlx::Error> for UserError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => UserError::UserNotFound,
            sqlx::Error::Database(db_err) if db_err.message().contains("UNIQUE") && db_err.message().contains("email") => {
                UserError::EmailAlreadyExists
            }
            _ => UserError::DatabaseError(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for ProductError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ProductError::ProductNotFound,
            _ => ProductError::DatabaseError(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for ExchangeError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ExchangeError::ExchangeNotFound,
            _ => ExchangeError::DatabaseError(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for ChatError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ChatError::ChatNotFound,
            _ => ChatError::DatabaseError(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for NotificationError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => NotificationError::NotificationNotFound,
            _ => NotificationError::DatabaseError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(UserError::UserNotFound.to_string(), "user not found");
        assert_eq!(ProductError::ProductNotFound.to_string(), "product not found");
        assert_eq!(
            ExchangeError::InvalidTransition {
                from: "rejected".into(),
                to: "accepted".into()
            }
            .to_string(),
            "invalid status transition: rejected -> accepted"
        );
        assert_eq!(ChatError::NotAParticipant.to_string(), "user is not a participant of this chat");
    }

    #[test]
    fn row_not_found_maps_to_domain_not_found() {
        let err: UserError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, UserError::UserNotFound));

        let err: NotificationError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, NotificationError::NotificationNotFound));
    }
}
