//! Document store writer.
//!
//! [`NotionStore`] turns a structured summary into a page in the configured
//! database: properties are built from the store-config mapping, the page
//! body from its content sections. Only the page URL comes back.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};

use tubenote_core::models::StructuredSummary;
use tubenote_core::AppError;

use crate::secrets::SecretProvider;
use crate::store_config::StoreConfig;

pub const API_KEY_SECRET: &str = "NOTION_API_KEY";

/// Store-side limit on multi-select option names.
const MAX_TAG_CHARS: usize = 100;
/// Store-side limit on a rich-text block.
const MAX_BLOCK_CHARS: usize = 2000;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document from the summary; returns its URL.
    async fn create_document(
        &self,
        config: &StoreConfig,
        summary: &StructuredSummary,
    ) -> Result<String, AppError>;
}

#[derive(Debug, Clone)]
pub struct NotionStoreConfig {
    pub endpoint: String,
    pub timeout_seconds: u64,
}

pub struct NotionStore {
    http: Client,
    secrets: Arc<dyn SecretProvider>,
    config: NotionStoreConfig,
}

const NOTION_VERSION: &str = "2022-06-28";

impl NotionStore {
    pub fn new(secrets: Arc<dyn SecretProvider>, config: NotionStoreConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .pool_max_idle_per_host(4)
            .build()
            .context("failed to create HTTP client for document store")?;
        Ok(Self {
            http,
            secrets,
            config,
        })
    }

    fn text_block(content: &str) -> Value {
        json!([{ "type": "text", "text": { "content": truncate_chars(content, MAX_BLOCK_CHARS) } }])
    }

    /// Build page properties from the summary according to the mapping.
    /// The first title target gets the real title property; any further
    /// targets receive the title as rich text.
    fn build_properties(config: &StoreConfig, summary: &StructuredSummary) -> Value {
        let mut properties = Map::new();

        let title_value = summary.display_title();
        let title_targets = config.targets_for("title", "Title");
        if let Some((first, rest)) = title_targets.split_first() {
            properties.insert(
                (*first).to_string(),
                json!({ "title": Self::text_block(title_value) }),
            );
            for name in rest {
                properties.insert(
                    (*name).to_string(),
                    json!({ "rich_text": Self::text_block(title_value) }),
                );
            }
        }

        if !summary.tags.is_empty() {
            let options: Vec<Value> = summary
                .tags
                .iter()
                .filter(|t| !t.trim().is_empty())
                .map(|t| json!({ "name": truncate_tag(t) }))
                .collect();
            for name in config.targets_for("tags", "Tags") {
                properties.insert(name.to_string(), json!({ "multi_select": options }));
            }
        }

        if !summary.url.is_empty() {
            for name in config.targets_for("url", "URL") {
                properties.insert(name.to_string(), json!({ "url": summary.url }));
            }
        }

        for static_prop in config.static_properties.values() {
            properties.insert(
                static_prop.property_name.clone(),
                json!({ "select": { "name": static_prop.value } }),
            );
        }

        Value::Object(properties)
    }

    /// Build page body blocks from the configured content sections. Sections
    /// whose field is empty in the summary are skipped entirely.
    fn build_children(config: &StoreConfig, summary: &StructuredSummary) -> Vec<Value> {
        let mut children = Vec::new();

        for section in &config.content_sections {
            let mut blocks = Vec::new();
            match section.field.as_str() {
                "brief_summary" => {
                    if !summary.brief_summary.is_empty() {
                        blocks.push(json!({
                            "object": "block",
                            "type": "paragraph",
                            "paragraph": { "rich_text": Self::text_block(&summary.brief_summary) }
                        }));
                    }
                }
                "summary_bullets" => {
                    for bullet in summary.summary_bullets.iter().filter(|b| !b.is_empty()) {
                        blocks.push(json!({
                            "object": "block",
                            "type": "bulleted_list_item",
                            "bulleted_list_item": { "rich_text": Self::text_block(bullet) }
                        }));
                    }
                }
                "tools_and_technologies" => {
                    for mention in &summary.tools_and_technologies {
                        let content = if mention.purpose.is_empty() {
                            mention.tool.clone()
                        } else {
                            format!("{}: {}", mention.tool, mention.purpose)
                        };
                        if content.is_empty() {
                            continue;
                        }
                        blocks.push(json!({
                            "object": "block",
                            "type": "bulleted_list_item",
                            "bulleted_list_item": { "rich_text": Self::text_block(&content) }
                        }));
                    }
                }
                other => {
                    tracing::debug!(field = other, "unknown content section field, skipping");
                }
            }

            if !blocks.is_empty() {
                children.push(json!({
                    "object": "block",
                    "type": "heading_2",
                    "heading_2": { "rich_text": Self::text_block(&section.heading) }
                }));
                children.extend(blocks);
            }
        }

        children
    }
}

#[async_trait]
impl DocumentStore for NotionStore {
    #[tracing::instrument(skip(self, config, summary), fields(title = %summary.display_title()))]
    async fn create_document(
        &self,
        config: &StoreConfig,
        summary: &StructuredSummary,
    ) -> Result<String, AppError> {
        let api_key = self.secrets.get_secret(API_KEY_SECRET).await?;

        let body = json!({
            "parent": { "database_id": config.database_id },
            "properties": Self::build_properties(config, summary),
            "children": Self::build_children(config, summary),
        });

        tracing::info!(database_id = %config.database_id, "creating knowledge-base page");

        let response = self
            .http
            .post(format!(
                "{}/pages",
                self.config.endpoint.trim_end_matches('/')
            ))
            .bearer_auth(api_key)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Store(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Store(format!(
                "store returned {status}: {}",
                detail.chars().take(500).collect::<String>()
            )));
        }

        let page: Value = response
            .json()
            .await
            .map_err(|e| AppError::Store(format!("unreadable store response: {e}")))?;

        match page.get("url").and_then(Value::as_str) {
            Some(url) if !url.is_empty() => {
                tracing::info!(page_url = url, "page created");
                Ok(url.to_string())
            }
            _ => Err(AppError::Store("no URL returned for created page".to_string())),
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Truncate a tag to the store's limit, preferring a word boundary so tags
/// don't end mid-word. Never returns an empty string for non-empty input.
fn truncate_tag(tag: &str) -> String {
    let tag = tag.trim();
    if tag.chars().count() <= MAX_TAG_CHARS {
        return tag.to_string();
    }

    let hard: String = tag.chars().take(MAX_TAG_CHARS).collect();
    match hard.rfind(' ') {
        Some(idx) if idx > 0 => {
            let at_word = hard[..idx].trim();
            if at_word.is_empty() {
                hard.trim().to_string()
            } else {
                at_word.to_string()
            }
        }
        _ => hard.trim().to_string(),
    }
}
