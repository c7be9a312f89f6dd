use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde_json::json;
use tracing::error;

use crate::errors::{LayerError, ValidationError};
use crate::server::session::login_redirect;
use crate::services::AuthError;

/// Error type returned by the JSON handlers.
#[derive(Debug)]
pub enum ApiError {
    Validation(Vec<ValidationError>),
    NotFound(String),
    /// Answered with a redirect to the login page; carries the requested path.
    LoginRequired(String),
    Unauthorized(String),
    Forbidden(String),
    Internal(String),
}

impl ApiError {
    pub fn login_required(next: impl Into<String>) -> Self {
        ApiError::LoginRequired(next.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(vec![err])
    }
}

impl From<Vec<ValidationError>> for ApiError {
    fn from(errors: Vec<ValidationError>) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<LayerError> for ApiError {
    fn from(err: LayerError) -> Self {
        match err {
            LayerError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            LayerError::Database(_) | LayerError::Io(_) => ApiError::internal(err),
            other => ApiError::Validation(vec![ValidationError::new(other.to_string())]),
        }
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        ApiError::internal(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::DatabaseError(message) => ApiError::Internal(message),
            AuthError::ValidationError(message) => ApiError::Validation(vec![ValidationError::new(message)]),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                let message = errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                let body = json!({
                    "error": "validation_failed",
                    "message": message,
                    "errors": errors,
                });
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "not_found", "message": message })))
                    .into_response()
            }
            ApiError::LoginRequired(next) => login_redirect(&next),
            ApiError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "unauthorized", "message": message })),
            )
                .into_response(),
            ApiError::Forbidden(message) => {
                (StatusCode::FORBIDDEN, Json(json!({ "error": "forbidden", "message": message })))
                    .into_response()
            }
            ApiError::Internal(message) => {
                error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal", "message": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
