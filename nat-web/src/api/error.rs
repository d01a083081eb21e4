//! API error responses
//!
//! Every error body is `{"error": message, "code": kind}` so the page can
//! show the message and branch on the code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nat_common::SessionError;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

/// Handler errors
#[derive(Debug)]
pub enum ApiError {
    SessionNotFound(Uuid),
    /// Rejected session command
    Session(SessionError),
    /// Malformed request value (e.g. an unknown category name)
    InvalidInput(String),
    /// Export requested before the session finished
    NotFinished,
    /// Endpoint disabled in production mode
    Unavailable,
    Internal(String),
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        ApiError::Session(e)
    }
}

impl From<nat_common::Error> for ApiError {
    fn from(e: nat_common::Error) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            ApiError::SessionNotFound(id) => (
                StatusCode::NOT_FOUND,
                format!("Session not found: {}", id),
                "session_not_found",
            ),
            ApiError::Session(e @ SessionError::SessionFinished) => {
                (StatusCode::CONFLICT, e.to_string(), e.code())
            }
            ApiError::Session(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string(), e.code()),
            ApiError::InvalidInput(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg, "invalid_input"),
            ApiError::NotFinished => (
                StatusCode::CONFLICT,
                "The session has not finished yet".to_string(),
                "session_not_finished",
            ),
            ApiError::Unavailable => (
                StatusCode::NOT_FOUND,
                "Not available in production mode".to_string(),
                "unavailable",
            ),
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg, "internal")
            }
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}
