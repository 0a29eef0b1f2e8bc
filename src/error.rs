use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Code failed safety, size or language checks before execution.
    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    /// Per-key submission window exhausted. Retryable after the window.
    #[error("Rate limit exceeded: retry after {retry_after_secs} seconds")]
    RateLimitExceeded { retry_after_secs: u64 },

    /// A final submission already exists for this (attempt, coding question).
    #[error("Final submission already exists: {submission_id}")]
    AlreadySubmitted { submission_id: Uuid },

    /// The code-execution service could not be reached or returned an
    /// unusable response. Distinct from "your code is wrong".
    #[error("Execution service unavailable: {0}")]
    ExecutionUnavailable(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            Error::InvalidSubmission(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "invalid_submission", "message": msg }),
            ),
            Error::RateLimitExceeded { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "error": "rate_limit_exceeded",
                    "retry_after_seconds": retry_after_secs,
                }),
            ),
            Error::AlreadySubmitted { submission_id } => (
                StatusCode::CONFLICT,
                json!({
                    "error": "already_submitted",
                    "message": "A final submission already exists for this question",
                    "submission_id": submission_id,
                }),
            ),
            Error::ExecutionUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "error": "execution_unavailable",
                    "message": "The code execution service is temporarily unavailable. This is not a problem with your code.",
                    "detail": msg,
                }),
            ),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() })),
            Error::Database(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": err.to_string() }),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() })),
            Error::Reqwest(err) => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": format!("External service error: {}", err) }),
            ),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg })),
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": err.to_string() }),
            ),
            Error::Anyhow(err) => (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() })),
            Error::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "An unexpected error occurred" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}
