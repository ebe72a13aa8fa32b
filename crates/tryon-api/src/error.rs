//! HTTP mapping for application errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tryon_core::{AppError, LogLevel};

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Wrapper giving `AppError` an HTTP rendering: the user-safe message as a
/// JSON body, the class-appropriate status, and a log line at the class's
/// level carrying the technical detail.
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<tryon_storage::StorageError> for HttpAppError {
    fn from(err: tryon_storage::StorageError) -> Self {
        HttpAppError(err.into())
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            // Path rejections read as plain 404s; the resolved path is never
            // echoed back.
            AppError::PathSecurity(_) => StatusCode::NOT_FOUND,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match self.0.log_level() {
            LogLevel::Debug => {
                tracing::debug!(error_type = self.0.error_type(), error = %self.0, "request failed")
            }
            LogLevel::Warn => {
                tracing::warn!(error_type = self.0.error_type(), error = %self.0, "request failed")
            }
            LogLevel::Error => {
                tracing::error!(error_type = self.0.error_type(), error = %self.0, "request failed")
            }
        }

        (
            status,
            Json(ErrorResponse {
                error: self.0.user_message(),
            }),
        )
            .into_response()
    }
}
