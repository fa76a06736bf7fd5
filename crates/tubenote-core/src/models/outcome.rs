//! Request and outcome models for the orchestration pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::summary::StructuredSummary;

/// Body of `POST /api/v0/summarize` and `POST /api/v0/summarize/async`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SummarizeRequest {
    /// Video URL to summarize.
    pub url: String,
    /// Optional URL to POST the terminal outcome to (async mode only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// Immediate acknowledgment returned by the async endpoint. Carries no
/// outcome data; the outcome is delivered via notification and callback.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AsyncAccepted {
    pub request_id: Uuid,
    pub status: String,
    pub accepted_at: DateTime<Utc>,
}

impl AsyncAccepted {
    pub fn new(request_id: Uuid) -> Self {
        Self {
            request_id,
            status: "accepted".to_string(),
            accepted_at: Utc::now(),
        }
    }
}

/// Pipeline stage in which a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validation,
    RateLimit,
    Summarization,
    Persistence,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Validation => "validation",
            Stage::RateLimit => "rate_limit",
            Stage::Summarization => "summarization",
            Stage::Persistence => "persistence",
        };
        f.write_str(name)
    }
}

/// Terminal result of one orchestration run. Produced exactly once per
/// admitted request and drives exactly one notification.
///
/// `PartialSuccess` is a first-class outcome: the summarization succeeded
/// and is preserved even though persistence failed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RequestOutcome {
    Success {
        summary: StructuredSummary,
        page_url: String,
    },
    PartialSuccess {
        summary: StructuredSummary,
        store_error: String,
    },
    Failure {
        stage: Stage,
        kind: String,
        message: String,
    },
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success { .. })
    }

    /// Summary carried by the outcome, when one was produced.
    pub fn summary(&self) -> Option<&StructuredSummary> {
        match self {
            RequestOutcome::Success { summary, .. }
            | RequestOutcome::PartialSuccess { summary, .. } => Some(summary),
            RequestOutcome::Failure { .. } => None,
        }
    }
}
