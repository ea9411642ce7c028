//! Error types for Lectorate services
//!
//! Provides the failure taxonomy of the rating engine with:
//! - Distinct error types for each failure mode
//! - HTTP status code mapping done once, at the boundary
//! - Structured error responses carrying a machine message and a
//!   localized (Russian) human-readable message

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    WrongMark,
    CommentTooLong,
    ForbiddenSymbol,

    // Authentication errors (2xxx)
    Unauthorized,

    // Authorization errors (3xxx)
    ForbiddenAction,

    // Resource errors (4xxx)
    NotFound,

    // Conflict errors (5xxx)
    AlreadyExists,
    UpdateConflict,

    // Quota errors (6xxx)
    TooManyCommentRequests,
    TooManyCommentsToLecturer,
    RateLimited,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    UpstreamError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::WrongMark => 1002,
            ErrorCode::CommentTooLong => 1003,
            ErrorCode::ForbiddenSymbol => 1004,

            ErrorCode::Unauthorized => 2001,

            ErrorCode::ForbiddenAction => 3001,

            ErrorCode::NotFound => 4001,

            ErrorCode::AlreadyExists => 5001,
            ErrorCode::UpdateConflict => 5002,

            ErrorCode::TooManyCommentRequests => 6001,
            ErrorCode::TooManyCommentsToLecturer => 6002,
            ErrorCode::RateLimited => 6003,

            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            ErrorCode::UpstreamError => 8001,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Resource errors
    #[error("Object {object} with identifier {id} not found")]
    ObjectNotFound { object: &'static str, id: String },

    // Conflict errors
    #[error("Object {object} with identifier {id} already exists")]
    AlreadyExists { object: &'static str, id: String },

    #[error("{message} Conflict with update of a resource that already exists or has conflicting information")]
    UpdateError { message: String },

    // Authorization errors
    #[error("Forbidden action with {object}")]
    ForbiddenAction { object: &'static str },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    // Quota errors
    #[error("Too many comment requests. Allowed: {limit} comments per {window_months} months")]
    TooManyCommentRequests { window_months: u32, limit: u32 },

    #[error("Too many comments to lecturer. Allowed: {limit} comments per {window_months} months")]
    TooManyCommentsToLecturer { window_months: u32, limit: u32 },

    #[error("Rate limit exceeded")]
    RateLimited,

    // Validation errors
    #[error("Marks can only take values: -2, -1, 0, 1, 2")]
    WrongMark,

    #[error("The comment is too long. Maximum of {max_symbols} symbols is allowed")]
    CommentTooLong { max_symbols: usize },

    #[error("The comment contains a forbidden symbol. Letters of the English and Russian languages, digits and punctuation marks are allowed")]
    ForbiddenSymbol,

    #[error("Validation failed: {message}")]
    Validation { message: String },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::ObjectNotFound { .. } => ErrorCode::NotFound,
            AppError::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            AppError::UpdateError { .. } => ErrorCode::UpdateConflict,
            AppError::ForbiddenAction { .. } => ErrorCode::ForbiddenAction,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::TooManyCommentRequests { .. } => ErrorCode::TooManyCommentRequests,
            AppError::TooManyCommentsToLecturer { .. } => ErrorCode::TooManyCommentsToLecturer,
            AppError::RateLimited => ErrorCode::RateLimited,
            AppError::WrongMark => ErrorCode::WrongMark,
            AppError::CommentTooLong { .. } => ErrorCode::CommentTooLong,
            AppError::ForbiddenSymbol => ErrorCode::ForbiddenSymbol,
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::WrongMark
            | AppError::CommentTooLong { .. }
            | AppError::ForbiddenSymbol
            | AppError::Validation { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            AppError::ForbiddenAction { .. } => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::ObjectNotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::AlreadyExists { .. } | AppError::UpdateError { .. } => StatusCode::CONFLICT,

            // 429 Too Many Requests
            AppError::TooManyCommentRequests { .. }
            | AppError::TooManyCommentsToLecturer { .. }
            | AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Localized human-readable message, paired 1:1 with the English one
    pub fn ru_message(&self) -> String {
        match self {
            AppError::ObjectNotFound { object, id } => {
                format!("Объект {object} с идентификатором {id} не найден")
            }
            AppError::AlreadyExists { object, id } => {
                format!("Объект {object} с идентификатором {id} уже существует")
            }
            AppError::UpdateError { message } => format!(
                "{message} Конфликт с обновлением ресурса, который уже существует или имеет противоречивую информацию"
            ),
            AppError::ForbiddenAction { object } => {
                format!("Запрещенное действие с объектом {object}")
            }
            AppError::Unauthorized { .. } => "Требуется авторизация".to_string(),
            AppError::TooManyCommentRequests { window_months, limit } => format!(
                "Слишком много попыток оставить комментарий. Разрешено: {limit} комментариев за {window_months} месяцев"
            ),
            AppError::TooManyCommentsToLecturer { window_months, limit } => format!(
                "Превышен лимит комментариев лектору. Разрешено: {limit} комментариев за {window_months} месяцев"
            ),
            AppError::RateLimited => "Слишком много запросов".to_string(),
            AppError::WrongMark => {
                "Оценки могут принимать только значения: -2, -1, 0, 1, 2".to_string()
            }
            AppError::CommentTooLong { max_symbols } => {
                format!("Комментарий слишком длинный. Разрешено максимум {max_symbols} символов")
            }
            AppError::ForbiddenSymbol => "Комментарий содержит запрещенный символ. Разрешены буквы английского и русского языков, цифры и знаки препинания".to_string(),
            AppError::Validation { message } => format!("Некорректный запрос: {message}"),
            _ => "Внутренняя ошибка сервиса".to_string(),
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for the API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub code: ErrorCode,
    pub message: String,
    pub ru: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = code.as_code(),
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = code.as_code(),
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            status: "Error".to_string(),
            code,
            ru: self.ru_message(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::ObjectNotFound {
            object: "Lecturer",
            id: "42".into(),
        };
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_quota_errors_are_rate_limited() {
        let global = AppError::TooManyCommentRequests {
            window_months: 10,
            limit: 20,
        };
        let per_lecturer = AppError::TooManyCommentsToLecturer {
            window_months: 6,
            limit: 5,
        };
        assert_eq!(global.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(per_lecturer.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_ne!(global.code(), per_lecturer.code());
        assert!(global.to_string().contains("20"));
        assert!(global.to_string().contains("10"));
    }

    #[test]
    fn test_validation_errors_are_bad_request() {
        assert_eq!(AppError::WrongMark.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::CommentTooLong { max_symbols: 3000 }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::ForbiddenSymbol.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_noop_update_is_conflict() {
        let err = AppError::UpdateError {
            message: "No changes detected in fields.".into(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_localized_message_present() {
        assert!(AppError::WrongMark.ru_message().contains("-2"));
    }
}
