use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::users::repo::RepoError;

/// Outward error kinds of the identity core.
///
/// Messages of the authentication variants are deliberately generic; the
/// internal cause is logged where the error is raised.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("user is not allowed to perform this action")]
    Forbidden,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user not found")]
    UserNotFound,
    #[error("unable to register with the supplied credentials")]
    UserAlreadyExists,
    #[error("{0} is already in use")]
    DuplicateField(String),
    #[error("invalid update field: {0}")]
    InvalidField(String),
    #[error("account has been deleted")]
    UserDeleted,
    #[error("failed to sign token")]
    SigningFailure,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidToken | AppError::Unauthorized(_) | AppError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden | AppError::UserDeleted => StatusCode::FORBIDDEN,
            AppError::UserNotFound => StatusCode::NOT_FOUND,
            AppError::UserAlreadyExists | AppError::DuplicateField(_) => StatusCode::CONFLICT,
            AppError::InvalidField(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::SigningFailure | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn internal(e: impl Into<anyhow::Error>) -> Self {
        Self::Internal(e.into())
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => AppError::UserNotFound,
            RepoError::DuplicateField(field) => AppError::DuplicateField(field),
            e @ RepoError::Database(_) => AppError::internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = ?self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
