//! Video summarization capability.
//!
//! [`GeminiSummarizer`] drives a hosted video-understanding model: the
//! validated URL is attached as file data next to a structured prompt, and
//! the response is parsed into a [`StructuredSummary`]. The call is made at
//! most once per request; retries are the caller's decision.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use tubenote_core::models::StructuredSummary;
use tubenote_core::validation::ValidatedVideoUrl;
use tubenote_core::AppError;

use crate::secrets::SecretProvider;

pub const API_KEY_SECRET: &str = "GOOGLE_API_KEY";

#[async_trait]
pub trait VideoSummarizer: Send + Sync {
    async fn summarize(&self, video: &ValidatedVideoUrl) -> Result<StructuredSummary, AppError>;
}

#[derive(Debug, Clone)]
pub struct GeminiSummarizerConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_seconds: u64,
}

pub struct GeminiSummarizer {
    http: Client,
    secrets: Arc<dyn SecretProvider>,
    config: GeminiSummarizerConfig,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiSummarizer {
    pub fn new(secrets: Arc<dyn SecretProvider>, config: GeminiSummarizerConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .pool_max_idle_per_host(4)
            .build()
            .context("failed to create HTTP client for summarizer")?;
        Ok(Self {
            http,
            secrets,
            config,
        })
    }

    fn build_prompt(video_url: &str) -> String {
        format!(
            "Analyze the attached video and return a comprehensive summary as a \
JSON object for a knowledge-base entry. The title must be the original video \
title. If the native language of the video is Spanish, write the summary in \
Spanish, otherwise in English.\n\n\
Return exactly this structure:\n\
{{\n\
  \"title\": \"The original video title\",\n\
  \"tags\": [\"tag1\", \"tag2\", \"tag3\"],\n\
  \"url\": \"{video_url}\",\n\
  \"brief_summary\": \"Concise paragraph summarizing the video content.\",\n\
  \"summary_bullets\": [\"Key point 1\", \"Key point 2\"],\n\
  \"tools_and_technologies\": [\n\
    {{\"tool\": \"Tool name\", \"purpose\": \"What it was used for\"}}\n\
  ]\n\
}}\n\n\
Make the summary informative and actionable. Focus on key takeaways, main \
concepts, and practical applications."
        )
    }

    /// Parse the model's text response. JSON is accepted bare or inside a
    /// markdown fence; anything else falls back to a raw-text summary so the
    /// content is not lost.
    fn parse_response(text: &str, video_url: &str) -> StructuredSummary {
        let candidate = extract_fenced_json(text).unwrap_or(text.trim());
        match serde_json::from_str::<StructuredSummary>(candidate) {
            Ok(mut summary) => {
                if summary.url.is_empty() {
                    summary.url = video_url.to_string();
                }
                summary
            }
            Err(e) => {
                tracing::warn!(error = %e, "summarizer response was not valid JSON, keeping raw text");
                StructuredSummary::from_raw_text(text.trim(), video_url)
            }
        }
    }
}

/// Extract the body of the first ```json (or plain ```) fence, if any.
fn extract_fenced_json(text: &str) -> Option<&str> {
    let (fence, skip) = if let Some(idx) = text.find("```json") {
        (idx, 7)
    } else if let Some(idx) = text.find("```") {
        (idx, 3)
    } else {
        return None;
    };
    let rest = &text[fence + skip..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

#[async_trait]
impl VideoSummarizer for GeminiSummarizer {
    #[tracing::instrument(skip(self), fields(video_id = %video.video_id))]
    async fn summarize(&self, video: &ValidatedVideoUrl) -> Result<StructuredSummary, AppError> {
        let api_key = self.secrets.get_secret(API_KEY_SECRET).await?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        let body = json!({
            "contents": [{
                "parts": [
                    { "file_data": { "file_uri": video.canonical_url } },
                    { "text": Self::build_prompt(&video.canonical_url) }
                ]
            }],
            // Low media resolution keeps token consumption down and allows
            // long videos to fit in the model's context.
            "generation_config": { "media_resolution": "MEDIA_RESOLUTION_LOW" }
        });

        tracing::info!(model = %self.config.model, url = %video.canonical_url, "requesting video summary");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Summarizer(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Summarizer(format!(
                "model returned {status}: {}",
                detail.chars().take(500).collect::<String>()
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Summarizer(format!("unreadable model response: {e}")))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();

        if text.trim().is_empty() {
            return Err(AppError::Summarizer("model returned an empty response".to_string()));
        }

        tracing::info!(response_chars = text.len(), "summarizer response received");
        Ok(Self::parse_response(&text, &video.canonical_url))
    }
}
