//! Summarization endpoints.
//!
//! Both endpoints share the pre-admission steps: body parsing, URL
//! validation, and rate limiting. Failures there are returned synchronously
//! in both modes and never produce a notification. After admission the sync
//! endpoint blocks to the terminal outcome while the async endpoint hands
//! the run to a background task and acknowledges immediately.

use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use tubenote_core::models::diagnostics::RequestMetadata;
use tubenote_core::models::{AsyncAccepted, RequestOutcome, SummarizeRequest};
use tubenote_core::validation::{validate_video_url, ValidatedVideoUrl};
use tubenote_core::AppError;
use tubenote_infra::Decision;

use crate::error::{ErrorResponse, HttpAppError};
use crate::orchestrator;
use crate::state::AppState;

/// Shared pre-admission steps: validate first, then consult the limiter, so
/// an invalid URL never consumes a window slot. A `Denied` decision is
/// mapped to the rate-limit error carrying the current window counters.
async fn admit_request(
    state: &AppState,
    request: &SummarizeRequest,
) -> Result<ValidatedVideoUrl, AppError> {
    let video = validate_video_url(&request.url)?;
    match state.limiter.check().await {
        Decision::Allowed { count } => {
            tracing::debug!(count, "request admitted");
            Ok(video)
        }
        Decision::Denied { count, limit } => Err(AppError::RateLimited { count, limit }),
    }
}

fn parse_body(
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<SummarizeRequest, AppError> {
    match payload {
        Ok(Json(request)) => Ok(request),
        Err(rejection) => Err(AppError::InvalidInput(format!(
            "malformed request body: {rejection}"
        ))),
    }
}

/// Request context captured for the diagnostic bundle, with sensitive
/// headers redacted before storage.
fn request_metadata(headers: &HeaderMap, request: &SummarizeRequest) -> RequestMetadata {
    let header_pairs = headers.iter().map(|(name, value)| {
        (
            name.as_str().to_string(),
            value.to_str().unwrap_or("<non-utf8>").to_string(),
        )
    });
    RequestMetadata::sanitized(
        serde_json::to_value(request).unwrap_or_default(),
        header_pairs,
        Utc::now(),
    )
}

/// Summarize a video synchronously.
#[utoipa::path(
    post,
    path = "/api/v0/summarize",
    tag = "summarize",
    request_body = SummarizeRequest,
    responses(
        (status = 200, description = "Terminal outcome (success or partial success)", body = RequestOutcome),
        (status = 400, description = "Malformed body or invalid video URL", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
        (status = 500, description = "Summarization failed", body = RequestOutcome)
    )
)]
#[tracing::instrument(skip(state, headers, payload))]
pub async fn summarize(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Response, HttpAppError> {
    let request = parse_body(payload)?;
    let video = admit_request(&state, &request).await?;

    let request_id = Uuid::new_v4();
    let meta = request_metadata(&headers, &request);
    state.capture.begin(request_id);

    let outcome = orchestrator::execute_admitted(&state, request_id, &video, meta, None)
        .instrument(orchestrator::orchestration_span(request_id))
        .await;

    let status = orchestrator::outcome_status(&outcome);
    Ok((status, Json(outcome)).into_response())
}

/// Summarize a video asynchronously.
///
/// Validation and admission still fail synchronously; after that the caller
/// gets an immediate `202` and the terminal outcome is delivered via the
/// notification channel and, when a callback URL was supplied, one POST to
/// it. The caller never polls.
#[utoipa::path(
    post,
    path = "/api/v0/summarize/async",
    tag = "summarize",
    request_body = SummarizeRequest,
    responses(
        (status = 202, description = "Accepted; outcome delivered via callback/notification", body = AsyncAccepted),
        (status = 400, description = "Malformed body or invalid video URL", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, headers, payload))]
pub async fn summarize_async(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Response, HttpAppError> {
    let request = parse_body(payload)?;
    let video = admit_request(&state, &request).await?;

    let request_id = Uuid::new_v4();
    let meta = request_metadata(&headers, &request);
    state.capture.begin(request_id);

    let accepted = AsyncAccepted::new(request_id);
    let span = orchestrator::orchestration_span(request_id);
    let task_state = state.clone();
    let callback_url = request.callback_url.clone();

    tokio::spawn(
        async move {
            orchestrator::execute_admitted(
                &task_state,
                request_id,
                &video,
                meta,
                callback_url.as_deref(),
            )
            .await;
        }
        .instrument(span),
    );

    tracing::info!(request_id = %request_id, "async summarization accepted");
    Ok((StatusCode::ACCEPTED, Json(accepted)).into_response())
}
