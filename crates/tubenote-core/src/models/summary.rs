//! Structured video summary produced by the summarizer capability.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A tool or technology mentioned in the video, with what it was used for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ToolMention {
    pub tool: String,
    #[serde(default)]
    pub purpose: String,
}

/// The summarizer's JSON contract. All fields default so a sparse model
/// response still deserializes; a response that is not JSON at all is kept
/// verbatim in `raw_response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StructuredSummary {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub brief_summary: String,
    #[serde(default)]
    pub summary_bullets: Vec<String>,
    #[serde(default)]
    pub tools_and_technologies: Vec<ToolMention>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl StructuredSummary {
    /// Fallback for model output that could not be parsed as JSON. The text
    /// is preserved so it still reaches the store and the notification.
    pub fn from_raw_text(text: impl Into<String>, url: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            title: String::new(),
            tags: Vec::new(),
            url: url.into(),
            brief_summary: text.clone(),
            summary_bullets: Vec::new(),
            tools_and_technologies: Vec::new(),
            raw_response: Some(text),
        }
    }

    /// Title for display, never empty.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "Untitled Video"
        } else {
            &self.title
        }
    }
}
