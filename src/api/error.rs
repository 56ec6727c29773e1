use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::errors::TaskplaneError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    /// Refresh-token reuse detected; distinct from `Unauthorized` so clients
    /// know every session is gone and a full re-login is required.
    SessionInvalidated(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::SessionInvalidated(_) => StatusCode::FORBIDDEN,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn unauthorized<S: Into<String>>(msg: S) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub fn forbidden<S: Into<String>>(msg: S) -> Self {
        ApiError::Forbidden(msg.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let error_kind = match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::SessionInvalidated(_) => "session_invalidated",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Internal(_) => "internal_error",
        };

        let message = match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::SessionInvalidated(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg) => msg,
        };

        (status, Json(ErrorBody { error: error_kind, message })).into_response()
    }
}

impl From<TaskplaneError> for ApiError {
    fn from(err: TaskplaneError) -> Self {
        match err {
            TaskplaneError::Validation { message, .. } => ApiError::BadRequest(message),
            TaskplaneError::Serialization { context, .. } => ApiError::BadRequest(context),
            TaskplaneError::Unauthorized { message } => ApiError::Unauthorized(message),
            TaskplaneError::SessionInvalidated { message } => ApiError::SessionInvalidated(message),
            TaskplaneError::Forbidden { message } => ApiError::Forbidden(message),
            TaskplaneError::NotFound { resource_type, id } => {
                ApiError::NotFound(format!("{} '{}' not found", resource_type, id))
            }
            TaskplaneError::Conflict { message, .. } => ApiError::Conflict(message),
            TaskplaneError::Database { context, .. } => ApiError::Internal(context),
            TaskplaneError::Config { message } | TaskplaneError::Internal { message } => {
                ApiError::Internal(message)
            }
            TaskplaneError::Io { context, .. } => ApiError::Internal(context),
        }
    }
}
