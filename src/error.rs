// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::quiz::flow::Screen;

/// Domain errors raised by the quiz core and its external boundaries.
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    /// Provider credentials or configuration are missing; no session can ever be opened.
    #[error("language model is not initialized: {0}")]
    Initialization(String),

    /// A message was sent before a session was opened.
    #[error("chat session not started")]
    NotInitialized,

    /// Network or provider-side failure. Always recoverable.
    #[error("language model provider failed: {0}")]
    Provider(String),

    /// Key-value storage failure.
    #[error("progress storage failed: {0}")]
    Persistence(String),

    #[error("{action} is not available while {screen:?}")]
    InvalidTransition { screen: Screen, action: &'static str },

    /// Another call for the same play-through is still pending.
    #[error("a request for this quiz is already in progress")]
    Busy,

    #[error("unknown topic '{0}' for this subject")]
    UnknownTopic(String),
}

impl From<sqlx::Error> for QuizError {
    fn from(err: sqlx::Error) -> Self {
        QuizError::Persistence(err.to_string())
    }
}

impl From<reqwest::Error> for QuizError {
    fn from(err: reqwest::Error) -> Self {
        QuizError::Provider(err.to_string())
    }
}

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (wrong screen, request already pending)
    Conflict(String),

    // 503 Service Unavailable (language model not configured)
    ServiceUnavailable(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg)
            }
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<QuizError> for AppError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::Initialization(_) => AppError::ServiceUnavailable(err.to_string()),
            QuizError::NotInitialized | QuizError::InvalidTransition { .. } | QuizError::Busy => {
                AppError::Conflict(err.to_string())
            }
            QuizError::UnknownTopic(_) => AppError::BadRequest(err.to_string()),
            QuizError::Provider(_) | QuizError::Persistence(_) => {
                AppError::InternalServerError(err.to_string())
            }
        }
    }
}

/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
