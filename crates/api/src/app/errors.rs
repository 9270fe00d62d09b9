use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use rollcall_core::{AppError, StoreError};

/// HTTP face of [`AppError`].
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::ProfileMissing | AppError::ProfileLookupFailed(_) | AppError::Forbidden(_) => {
                StatusCode::FORBIDDEN
            }
            AppError::DomainValidation(_) | AppError::Upstream(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self.0.public_message() {
            Some(message) => json!({ "error": self.0.label(), "message": message }),
            None => json!({ "error": self.0.label() }),
        };
        (status, axum::Json(body)).into_response()
    }
}

/// `400 {"error": message}`, the shape of every non-auth failure.
pub fn bad_request(message: impl Into<String>) -> Response {
    json_error(StatusCode::BAD_REQUEST, message)
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, axum::Json(json!({ "error": message.into() }))).into_response()
}

/// Store failures on the students table.
pub fn student_store_error(err: StoreError) -> Response {
    match err {
        StoreError::Duplicate(constraint) => {
            tracing::info!(%constraint, "student insert rejected by unique constraint");
            bad_request("Email or Roll Number already exists")
        }
        other => {
            if let StoreError::Backend(ref detail) = other {
                tracing::error!(error = %detail, "student store failure");
            }
            ApiError::from(AppError::from(other)).into_response()
        }
    }
}
