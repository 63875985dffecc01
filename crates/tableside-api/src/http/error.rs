//! Application error type mapping to HTTP status codes and envelope format.

use axum::response::{IntoResponse, Response};

use tableside_types::error::{RepositoryError, SessionError};

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Neither a live actor nor the store knows the session.
    SessionNotFound(String),
    Session(SessionError),
    Validation(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Session(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Session(SessionError::Persistence(e))
    }
}

impl AppError {
    /// Machine-readable code and human-readable message.
    pub fn code_and_message(&self) -> (&'static str, String) {
        match self {
            AppError::SessionNotFound(id) => {
                ("SESSION_NOT_FOUND", format!("Session '{id}' not found"))
            }
            AppError::Session(e @ (SessionError::Activation { .. } | SessionError::Persistence(_))) => {
                ("STORAGE_ERROR", e.to_string())
            }
            AppError::Session(e @ SessionError::Unavailable(_)) => ("INTERNAL_ERROR", e.to_string()),
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, message) = self.code_and_message();
        if code == "INTERNAL_ERROR" || code == "STORAGE_ERROR" {
            tracing::error!(code, %message, "request failed");
        }
        ApiResponse::error(code, &message).into_response()
    }
}
