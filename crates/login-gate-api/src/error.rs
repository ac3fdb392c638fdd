//! API error handling
//!
//! Every error body has the same shape: `{"error": "<message>"}`.

use crate::auth::CredentialError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use login_gate_core::DirectoryError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Message for any failed login, whatever the cause
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Human-readable message
    pub error: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Unauthorized,
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new(msg)),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::new(msg)),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, ApiError::new(INVALID_CREDENTIALS)),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new("Internal server error"),
                )
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::UsernameTaken | DirectoryError::EmailTaken => {
                AppError::BadRequest(err.to_string())
            }
            DirectoryError::Unavailable(msg) => AppError::Internal(format!("Directory error: {msg}")),
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Unauthenticated => AppError::Unauthorized,
            CredentialError::Directory(e) => AppError::from(e),
            CredentialError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {field}"))
                })
            })
            .min()
            .unwrap_or_else(|| "Validation failed".to_string());
        AppError::BadRequest(message)
    }
}
