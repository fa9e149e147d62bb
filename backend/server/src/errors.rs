//! Application-wide error types.
//!
//! [`ServerError`] covers infrastructure failures. [`ApiError`] is what handlers
//! return: it wraps the domain error kinds from `crowdfund_core` and renders the
//! `{status:false, message, code}` envelope with a matching HTTP status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crowdfund_core::{
    CategoryError, DonationError, ErrorClass, ErrorKind, FundError, KycError, PayoutError,
    WithdrawalError,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Notification error: {0}")]
    Notify(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Donation(#[from] DonationError),

    #[error(transparent)]
    Fund(#[from] FundError),

    #[error(transparent)]
    Payout(#[from] PayoutError),

    #[error(transparent)]
    Withdrawal(#[from] WithdrawalError),

    #[error(transparent)]
    Category(#[from] CategoryError),

    #[error(transparent)]
    Kyc(#[from] KycError),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Server(#[from] ServerError),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Server(ServerError::Database(e))
    }
}

fn class_status(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::Invalid => StatusCode::BAD_REQUEST,
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::Conflict => StatusCode::CONFLICT,
        ErrorClass::Forbidden => StatusCode::FORBIDDEN,
    }
}

impl ApiError {
    /// Domain error code and class, when this is a domain error.
    fn kind(&self) -> Option<(&'static str, ErrorClass)> {
        let kind: &dyn ErrorKind = match self {
            Self::Donation(e) => e,
            Self::Fund(e) => e,
            Self::Payout(e) => e,
            Self::Withdrawal(e) => e,
            Self::Category(e) => e,
            Self::Kyc(e) => e,
            _ => return None,
        };
        Some((kind.code(), kind.class()))
    }

    pub fn status_code(&self) -> StatusCode {
        if let Some((_, class)) = self.kind() {
            return class_status(class);
        }
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {self}");
            "Something went wrong. Please try again later.".to_string()
        } else {
            self.to_string()
        };

        let body = match self.kind() {
            Some((code, _)) => json!({ "status": false, "message": message, "code": code }),
            None => json!({ "status": false, "message": message }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_class_status() {
        assert_eq!(
            ApiError::from(DonationError::FundNotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(WithdrawalError::PendingRequestExists).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(FundError::NotOwner).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_infrastructure_errors_are_500() {
        let err = ApiError::from(ServerError::Config("boom".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
