use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Round not found")]
    RoundNotFound,

    #[error("Caller is not the competition organiser")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    /// Stable outcome code carried in every error response.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::RoundNotFound => "ROUND_NOT_FOUND",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::Database(_) | ApiError::Internal(_) => "SERVER_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        let (status, message) = match self {
            ApiError::Validation(_) => (actix_web::http::StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::RoundNotFound => (actix_web::http::StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Unauthorized => (actix_web::http::StatusCode::FORBIDDEN, self.to_string()),
            // Persistence and internal failures abort the settlement unit;
            // no internal detail crosses the boundary.
            ApiError::Database(_) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            ),
            ApiError::Internal(_) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: message,
            code: self.code(),
        };

        HttpResponse::build(status).json(error_response)
    }
}
