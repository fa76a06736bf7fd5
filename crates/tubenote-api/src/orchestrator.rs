//! Request orchestration pipeline.
//!
//! One run per admitted request, strictly sequential:
//! summarize, then resolve config and persist, then notify. The stages after
//! admission never run in parallel because persistence needs the summary and
//! notification needs the persistence outcome. There is no rollback and no
//! automatic retry; a persistence failure downgrades the outcome to
//! `PartialSuccess` instead of discarding the costly summarization result.
//!
//! Exactly one notification fires per admitted request, dispatched after the
//! terminal outcome is known. Validation and admission failures are handled
//! before this module is reached and produce no notification.

use axum::http::StatusCode;
use uuid::Uuid;

use tubenote_core::models::diagnostics::{DiagnosticBundle, ErrorInfo, RequestMetadata};
use tubenote_core::models::{RequestOutcome, Stage};
use tubenote_core::validation::ValidatedVideoUrl;

use crate::state::AppState;

/// Span wrapping a whole orchestration run. The diagnostic capture layer
/// keys on the `request_id` field recorded here.
pub fn orchestration_span(request_id: Uuid) -> tracing::Span {
    tracing::info_span!("orchestrate", request_id = %request_id)
}

/// Drive an admitted request to its terminal state: run the stages, tear
/// down log capture, dispatch exactly one notification, and deliver the
/// callback if one was requested. Returns the terminal outcome.
pub async fn execute_admitted(
    state: &AppState,
    request_id: Uuid,
    video: &ValidatedVideoUrl,
    request_meta: RequestMetadata,
    callback_url: Option<&str>,
) -> RequestOutcome {
    let outcome = run_stages(state, video).await;
    finalize(state, request_id, &outcome, request_meta);

    if let Some(url) = callback_url {
        // Best effort by design: one attempt, failures are logged only.
        if let Err(e) = state.callbacks.deliver(url, request_id, &outcome).await {
            tracing::warn!(error = %e, "callback delivery failed");
        }
    }

    outcome
}

async fn run_stages(state: &AppState, video: &ValidatedVideoUrl) -> RequestOutcome {
    tracing::info!(url = %video.canonical_url, "starting summarization");

    // Admitted -> Summarized. Attempted exactly once; the external call is
    // costly, so retries are left to the caller.
    let summary = match state.summarizer.summarize(video).await {
        Ok(summary) => {
            tracing::info!(title = %summary.display_title(), "video summarized");
            summary
        }
        Err(e) => {
            tracing::error!(error = %e, "summarization failed");
            return RequestOutcome::Failure {
                stage: Stage::Summarization,
                kind: e.error_code().to_string(),
                message: e.to_string(),
            };
        }
    };

    // Summarized -> Persisted. Config resolution is part of this stage; any
    // failure here keeps the summary and downgrades the outcome.
    match persist(state, &summary).await {
        Ok(page_url) => {
            tracing::info!(page_url = %page_url, "summary persisted");
            RequestOutcome::Success { summary, page_url }
        }
        Err(e) => {
            tracing::warn!(error = %e, "persistence failed, preserving summary");
            RequestOutcome::PartialSuccess {
                summary,
                store_error: e.to_string(),
            }
        }
    }
}

async fn persist(
    state: &AppState,
    summary: &tubenote_core::models::StructuredSummary,
) -> Result<String, tubenote_core::AppError> {
    let config = state.store_config.resolve().await?;
    state.store.create_document(&config, summary).await
}

/// Terminal step: drain the capture buffer and dispatch the one notification
/// this request gets. Success notifications carry no bundle; failure and
/// partial-success notifications attach the diagnostic report.
fn finalize(
    state: &AppState,
    request_id: Uuid,
    outcome: &RequestOutcome,
    request_meta: RequestMetadata,
) {
    let records = state.capture.finish(request_id);

    match outcome {
        RequestOutcome::Success { summary, page_url } => {
            state.notifier.dispatch_success(summary, page_url);
        }
        RequestOutcome::PartialSuccess { store_error, .. } => {
            let bundle = DiagnosticBundle::new(
                request_meta,
                records,
                Some(ErrorInfo {
                    stage: Stage::Persistence.to_string(),
                    kind: "store_error".to_string(),
                    message: store_error.clone(),
                }),
            );
            state.notifier.dispatch_failure(outcome, &bundle);
        }
        RequestOutcome::Failure { stage, kind, message } => {
            let bundle = DiagnosticBundle::new(
                request_meta,
                records,
                Some(ErrorInfo {
                    stage: stage.to_string(),
                    kind: kind.clone(),
                    message: message.clone(),
                }),
            );
            state.notifier.dispatch_failure(outcome, &bundle);
        }
    }
}

/// HTTP status for a terminal outcome in synchronous mode. A partial
/// success is still a 200: the caller got a summary.
pub fn outcome_status(outcome: &RequestOutcome) -> StatusCode {
    match outcome {
        RequestOutcome::Success { .. } | RequestOutcome::PartialSuccess { .. } => StatusCode::OK,
        RequestOutcome::Failure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
