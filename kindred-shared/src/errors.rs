use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Profile and account errors
/// - E2xxx: Photo ingestion errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    BadRequest,
    PayloadTooLarge,

    // Profiles (E1xxx)
    UserNotFound,
    EmailAlreadyExists,
    InvalidCredentials,
    PasswordTooWeak,

    // Photos (E2xxx)
    MissingInput,
    UnsupportedFormat,
    ProcessingFailed,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::BadRequest => "E0007",
            Self::PayloadTooLarge => "E0008",

            // Profiles
            Self::UserNotFound => "E1001",
            Self::EmailAlreadyExists => "E1002",
            Self::InvalidCredentials => "E1003",
            Self::PasswordTooWeak => "E1004",

            // Photos
            Self::MissingInput => "E2001",
            Self::UnsupportedFormat => "E2002",
            Self::ProcessingFailed => "E2003",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::ProcessingFailed => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::PasswordTooWeak
            | Self::MissingInput => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NotFound | Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::EmailAlreadyExists => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known { code: ErrorCode, message: String },

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The error code this error renders with.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::Known { code, .. } => *code,
            AppError::Database(diesel::result::Error::NotFound) => ErrorCode::NotFound,
            AppError::Database(_) => ErrorCode::InternalError,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message } => {
                (code.status_code(), ApiErrorResponse::new(code.code(), message))
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn codes_are_unique_and_grouped_by_area() {
        let all = [
            ErrorCode::InternalError,
            ErrorCode::ValidationError,
            ErrorCode::NotFound,
            ErrorCode::Unauthorized,
            ErrorCode::BadRequest,
            ErrorCode::PayloadTooLarge,
            ErrorCode::UserNotFound,
            ErrorCode::EmailAlreadyExists,
            ErrorCode::InvalidCredentials,
            ErrorCode::PasswordTooWeak,
            ErrorCode::MissingInput,
            ErrorCode::UnsupportedFormat,
            ErrorCode::ProcessingFailed,
        ];
        let codes: std::collections::HashSet<&str> = all.iter().map(ErrorCode::code).collect();
        assert_eq!(codes.len(), all.len());
        assert_eq!(ErrorCode::EmailAlreadyExists.status_code(), StatusCode::CONFLICT);
        assert!(all.iter().all(|c| c.status_code().is_client_error() || c.status_code().is_server_error()));
    }

    #[test]
    fn photo_errors_map_to_expected_statuses() {
        assert_eq!(ErrorCode::MissingInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::UnsupportedFormat.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(ErrorCode::ProcessingFailed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn known_error_body() {
        let value = body_json(AppError::new(ErrorCode::UserNotFound, "user not found")).await;
        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "E1001");
        assert_eq!(value["error"]["message"], "user not found");
        assert!(value["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn database_errors_hide_the_cause() {
        let err = AppError::from(diesel::result::Error::RollbackTransaction);
        assert_eq!(err.error_code(), ErrorCode::InternalError);
        let value = body_json(err).await;
        assert_eq!(value["error"]["code"], "E0001");
        assert_eq!(value["error"]["message"], "database error");
    }

    #[test]
    fn missing_row_is_not_found() {
        let err = AppError::from(diesel::result::Error::NotFound);
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
