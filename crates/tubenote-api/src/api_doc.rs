//! OpenAPI document.

use utoipa::OpenApi;

use tubenote_core::models::{
    AsyncAccepted, RequestOutcome, Stage, StructuredSummary, SummarizeRequest, ToolMention,
};

use crate::error::ErrorResponse;
use crate::handlers;
use crate::handlers::health::HealthResponse;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tubenote API",
        description = "Accepts video URLs, summarizes them with a hosted AI model, and persists the summaries into a knowledge base."
    ),
    paths(
        handlers::summarize::summarize,
        handlers::summarize::summarize_async,
        handlers::health::health,
        handlers::config::reload,
    ),
    components(schemas(
        SummarizeRequest,
        AsyncAccepted,
        RequestOutcome,
        StructuredSummary,
        ToolMention,
        Stage,
        ErrorResponse,
        HealthResponse,
    )),
    tags(
        (name = "summarize", description = "Video summarization"),
        (name = "system", description = "Health and configuration")
    )
)]
pub struct ApiDoc;
