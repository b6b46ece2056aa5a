// Error handling types for the API

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt;
use tracing::error;

use super::validation::ValidationResult;
use crate::account::coordinator::CascadeStage;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    NotFound(String),
    EmailTaken(String),
    ReauthRequired(String),
    CascadeFailed(CascadeStage),
    InternalServer(String),
    DatabaseError(sqlx::Error),
    ValidationError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::EmailTaken(msg) => write!(f, "Email Taken: {}", msg),
            ApiError::ReauthRequired(msg) => write!(f, "Reauth Required: {}", msg),
            ApiError::CascadeFailed(stage) => write!(f, "Cascade Failed: {}", stage),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::DatabaseError(e) => write!(f, "Database Error: {}", e),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message, code) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, "UNAUTHORIZED"),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
            ApiError::EmailTaken(msg) => (StatusCode::CONFLICT, msg, "EMAIL_TAKEN"),
            ApiError::ReauthRequired(msg) => (
                StatusCode::PRECONDITION_REQUIRED,
                msg,
                "REAUTH_REQUIRED",
            ),
            ApiError::CascadeFailed(stage) => {
                error!(stage = %stage, "Account deletion cascade failed");
                let code = match stage {
                    CascadeStage::TasksDeleting => "CASCADE_TASKS_FAILED",
                    CascadeStage::CredentialDeleting => "CASCADE_CREDENTIAL_FAILED",
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("account deletion failed during {}", stage),
                    code,
                )
            }
            ApiError::InternalServer(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg,
                "INTERNAL_SERVER_ERROR",
            ),
            ApiError::DatabaseError(e) => {
                error!(error = %e, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database operation failed".to_string(),
                    "DATABASE_ERROR",
                )
            }
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg, "VALIDATION_ERROR"),
        };

        let error_response = ErrorResponse {
            error: error_message,
            code: code.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Helper function to convert ValidationResult to ApiError
impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        if result.is_valid {
            ApiError::InternalServer(
                "Validation result was valid but converted to error".to_string(),
            )
        } else {
            let error_messages: Vec<String> = result
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            ApiError::ValidationError(error_messages.join(", "))
        }
    }
}
