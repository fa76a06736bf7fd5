//! Master API key authentication.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use tubenote_core::AppError;

use crate::error::HttpAppError;

#[derive(Clone)]
pub struct AuthState {
    pub master_api_key: String,
}

/// Constant-time comparison to prevent timing attacks on key validation.
fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Middleware guarding the summarization and config routes with a bearer
/// master key.
pub async fn require_api_key(
    State(auth): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    let header = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let Some(token) = header.strip_prefix("Bearer ") else {
        return HttpAppError(AppError::Unauthorized(
            "invalid authorization header format".to_string(),
        ))
        .into_response();
    };

    if !secure_compare(token, &auth.master_api_key) {
        return HttpAppError(AppError::Unauthorized("invalid API key".to_string()))
            .into_response();
    }

    next.run(request).await
}
