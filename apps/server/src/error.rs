//! API error mapping: domain errors to status codes and a JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use gardenswap_auth::AuthError;
use gardenswap_database::{
    ChatError, ExchangeError, NotificationError, ProductError, UserError,
};
use gardenswap_users::{AccountError, MergeError};

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        let status = match value {
            AuthError::GoogleOauthDisabled => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::GoogleOauth(_) => StatusCode::BAD_GATEWAY,
            AuthError::InvalidCredentials
            | AuthError::SessionNotFound
            | AuthError::SessionExpired
            | AuthError::InvalidSession => StatusCode::UNAUTHORIZED,
            AuthError::UserExists => StatusCode::BAD_REQUEST,
            AuthError::Database(_) | AuthError::PasswordHash(_) => {
                error!(error = %value, "auth internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, value.to_string())
    }
}

impl From<UserError> for ApiError {
    fn from(value: UserError) -> Self {
        let status = match value {
            UserError::UserNotFound => StatusCode::NOT_FOUND,
            UserError::EmailAlreadyExists
            | UserError::InvalidCoordinates
            | UserError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            UserError::DatabaseError(_) => {
                error!(error = %value, "user internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, value.to_string())
    }
}

impl From<ProductError> for ApiError {
    fn from(value: ProductError) -> Self {
        let status = match value {
            ProductError::ProductNotFound => StatusCode::NOT_FOUND,
            ProductError::NotProductOwner => StatusCode::FORBIDDEN,
            ProductError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            ProductError::DatabaseError(_) => {
                error!(error = %value, "product internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, value.to_string())
    }
}

impl From<ExchangeError> for ApiError {
    fn from(value: ExchangeError) -> Self {
        let status = match value {
            ExchangeError::ExchangeNotFound | ExchangeError::ProductNotFound => {
                StatusCode::NOT_FOUND
            }
            ExchangeError::NotOwner | ExchangeError::NotAParty => StatusCode::FORBIDDEN,
            ExchangeError::OwnProduct
            | ExchangeError::AlreadyRequested
            | ExchangeError::AlreadyReviewed
            | ExchangeError::InvalidTransition { .. }
            | ExchangeError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            ExchangeError::DatabaseError(_) => {
                error!(error = %value, "exchange internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, value.to_string())
    }
}

impl From<ChatError> for ApiError {
    fn from(value: ChatError) -> Self {
        let status = match value {
            ChatError::ChatNotFound => StatusCode::NOT_FOUND,
            ChatError::NotAParticipant => StatusCode::FORBIDDEN,
            ChatError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            ChatError::DatabaseError(_) => {
                error!(error = %value, "chat internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, value.to_string())
    }
}

impl From<NotificationError> for ApiError {
    fn from(value: NotificationError) -> Self {
        let status = match value {
            NotificationError::NotificationNotFound => StatusCode::NOT_FOUND,
            NotificationError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            NotificationError::DatabaseError(_) => {
                error!(error = %value, "notification internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, value.to_string())
    }
}

impl From<MergeError> for ApiError {
    fn from(value: MergeError) -> Self {
        error!(error = %value, "account merge failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, value.to_string())
    }
}

impl From<AccountError> for ApiError {
    fn from(value: AccountError) -> Self {
        let status = match value {
            AccountError::UserNotFound => StatusCode::NOT_FOUND,
            AccountError::Database(_) => {
                error!(error = %value, "account deletion failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, value.to_string())
    }
}
