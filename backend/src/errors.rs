use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use cred_registry::{CredError, TreeError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error")]
    Internal,
}

impl From<CredError> for ApiError {
    fn from(e: CredError) -> Self {
        let msg = e.to_string();
        match e {
            CredError::CredDoesNotExist(_) => ApiError::NotFound(msg),
            CredError::NotAdmin => ApiError::Forbidden(msg),
            CredError::CredAlreadyExists(_)
            | CredError::NullifierReused
            | CredError::Tree(TreeError::TreeFull) => ApiError::Conflict(msg),
            CredError::CredIdTooLarge
            | CredError::DepthNotSupported(_)
            | CredError::Tree(_)
            | CredError::RootNotPartOfCred
            | CredError::RootExpired
            | CredError::InvalidProof(_) => ApiError::BadRequest(msg),
            CredError::ReplayMismatch(_) => {
                tracing::error!(error = %msg, "registry diverged from journal");
                ApiError::Internal
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
        };

        (status, Json(ErrorBody { error: msg })).into_response()
    }
}
