//! Per-request diagnostic bundle.
//!
//! The bundle collects every log record emitted during one orchestration run
//! plus sanitized request metadata, and renders a markdown report that is
//! attached to failure notifications. Redaction is applied before anything
//! is stored here, never after.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "cookie",
    "x-api-key",
];

const SENSITIVE_FIELDS: &[&str] = &[
    "api_key",
    "apikey",
    "authorization",
    "connection_string",
    "password",
    "secret",
    "signing_secret",
    "token",
];

pub const REDACTED: &str = "[REDACTED]";

/// Whether a request header's value must never be stored in a bundle.
pub fn is_sensitive_header(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SENSITIVE_HEADERS.contains(&lower.as_str())
}

/// Whether a structured log field's value must be redacted before capture.
pub fn is_sensitive_field(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SENSITIVE_FIELDS
        .iter()
        .any(|s| lower == *s || lower.ends_with(&format!("_{s}")))
}

/// One captured log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
}

/// Sanitized request context captured at admission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestMetadata {
    pub body: serde_json::Value,
    pub headers: BTreeMap<String, String>,
    pub received_at: Option<DateTime<Utc>>,
}

impl RequestMetadata {
    /// Build metadata from raw header pairs, redacting sensitive values.
    pub fn sanitized(
        body: serde_json::Value,
        headers: impl IntoIterator<Item = (String, String)>,
        received_at: DateTime<Utc>,
    ) -> Self {
        let headers = headers
            .into_iter()
            .map(|(name, value)| {
                if is_sensitive_header(&name) {
                    (name, REDACTED.to_string())
                } else {
                    (name, value)
                }
            })
            .collect();
        Self {
            body,
            headers,
            received_at: Some(received_at),
        }
    }
}

/// Error details for the report header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub stage: String,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticBundle {
    pub request: RequestMetadata,
    pub records: Vec<LogRecord>,
    pub error: Option<ErrorInfo>,
    pub generated_at: DateTime<Utc>,
}

impl DiagnosticBundle {
    pub fn new(request: RequestMetadata, records: Vec<LogRecord>, error: Option<ErrorInfo>) -> Self {
        Self {
            request,
            records,
            error,
            generated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Render the bundle as a markdown report for the failure notification
    /// attachment.
    pub fn markdown_report(&self) -> String {
        use std::fmt::Write;

        let mut md = String::new();
        let _ = writeln!(md, "# Summarization Failure Report\n");
        let _ = writeln!(md, "**Generated:** {}\n", self.generated_at.to_rfc3339());
        let _ = writeln!(md, "---\n");

        let _ = writeln!(md, "## Request\n");
        let _ = writeln!(md, "```json");
        let _ = writeln!(
            md,
            "{}",
            serde_json::to_string_pretty(&self.request.body).unwrap_or_default()
        );
        let _ = writeln!(md, "```\n");
        if !self.request.headers.is_empty() {
            let _ = writeln!(md, "### Headers\n");
            let _ = writeln!(md, "```");
            for (name, value) in &self.request.headers {
                let _ = writeln!(md, "{name}: {value}");
            }
            let _ = writeln!(md, "```\n");
        }

        let _ = writeln!(md, "## Error\n");
        match &self.error {
            Some(error) => {
                let _ = writeln!(md, "**Stage:** `{}`\n", error.stage);
                let _ = writeln!(md, "**Kind:** `{}`\n", error.kind);
                let _ = writeln!(md, "**Message:**\n\n```\n{}\n```\n", error.message);
            }
            None => {
                let _ = writeln!(md, "*No error information captured*\n");
            }
        }

        let _ = writeln!(md, "## Runtime Logs\n");
        if self.records.is_empty() {
            let _ = writeln!(md, "*No logs captured*\n");
        } else {
            let _ = writeln!(md, "| Timestamp | Level | Message |");
            let _ = writeln!(md, "|-----------|-------|---------|");
            for record in &self.records {
                let message: String = record
                    .message
                    .replace('\n', " ")
                    .replace('|', "\\|")
                    .chars()
                    .take(120)
                    .collect();
                let _ = writeln!(
                    md,
                    "| {} | {} | {} |",
                    record.timestamp.format("%H:%M:%S%.3f"),
                    record.level,
                    message
                );
            }
        }

        md
    }
}
