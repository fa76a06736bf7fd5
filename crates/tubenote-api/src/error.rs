//! HTTP error response conversion
//!
//! Wraps `AppError` so it can implement `IntoResponse` here without running
//! into the orphan rule, and keeps the response body shape in one place.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use tubenote_core::{AppError, LogLevel};

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    /// Requests counted in the current window; rate-limit errors only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests_in_window: Option<usize>,
    /// Window limit; rate-limit errors only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Wrapper type for AppError to implement IntoResponse.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

fn log_error(error: &AppError) {
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, code, "request failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, code, "request failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, code, "request failed");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let error = &self.0;

        let status = StatusCode::from_u16(error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(error);

        let (requests_in_window, limit) = match error {
            AppError::RateLimited { count, limit } => (Some(*count), Some(*limit)),
            _ => (None, None),
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            code: error.error_code().to_string(),
            recoverable: error.is_recoverable(),
            requests_in_window,
            limit,
        });

        (status, body).into_response()
    }
}
