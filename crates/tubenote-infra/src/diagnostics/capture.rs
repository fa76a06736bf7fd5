//! Request-scoped diagnostic log capture.
//!
//! A `tracing` layer that buffers every event emitted inside an
//! orchestration span, keyed by the span's `request_id` field. The
//! orchestrator registers a buffer at admission and drains it after the
//! terminal notification; the layer itself is installed once, globally.
//!
//! Redaction happens here, at capture time: values of secret-like fields are
//! replaced before they are stored in any buffer.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use tubenote_core::models::diagnostics::{is_sensitive_field, LogRecord, REDACTED};

type Buffer = Arc<Mutex<Vec<LogRecord>>>;

/// Registry of active capture buffers, shared between the layer (writer)
/// and the orchestrator (owner).
#[derive(Clone, Default)]
pub struct DiagnosticCapture {
    buffers: Arc<RwLock<HashMap<String, Buffer>>>,
}

impl DiagnosticCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start capturing for a request. Idempotent per id.
    pub fn begin(&self, request_id: uuid::Uuid) {
        self.buffers
            .write()
            .expect("capture registry poisoned")
            .entry(request_id.to_string())
            .or_default();
    }

    /// Stop capturing and return everything recorded for the request.
    pub fn finish(&self, request_id: uuid::Uuid) -> Vec<LogRecord> {
        let buffer = self
            .buffers
            .write()
            .expect("capture registry poisoned")
            .remove(&request_id.to_string());
        match buffer {
            Some(buffer) => std::mem::take(&mut *buffer.lock().expect("capture buffer poisoned")),
            None => Vec::new(),
        }
    }

    /// The layer to install into the subscriber stack.
    pub fn layer(&self) -> DiagnosticCaptureLayer {
        DiagnosticCaptureLayer {
            buffers: self.buffers.clone(),
        }
    }
}

pub struct DiagnosticCaptureLayer {
    buffers: Arc<RwLock<HashMap<String, Buffer>>>,
}

/// Marker stored in span extensions for spans that carry a `request_id`.
struct CaptureScope(String);

#[derive(Default)]
struct RequestIdVisitor {
    request_id: Option<String>,
}

impl Visit for RequestIdVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "request_id" {
            self.request_id = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "request_id" {
            self.request_id = Some(format!("{value:?}").trim_matches('"').to_string());
        }
    }
}

/// Formats an event into a single message line, redacting sensitive fields.
#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: String,
}

impl EventVisitor {
    fn push_field(&mut self, name: &str, rendered: &str) {
        let value = if is_sensitive_field(name) {
            REDACTED
        } else {
            rendered
        };
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{name}={value}");
    }

    fn into_message(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (false, false) => format!("{} {}", self.message, self.fields),
            (false, true) => self.message,
            (true, false) => self.fields,
            (true, true) => String::new(),
        }
    }
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.push_field(field.name(), &rendered);
        }
    }
}

impl<S> Layer<S> for DiagnosticCaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = RequestIdVisitor::default();
        attrs.record(&mut visitor);
        if let Some(request_id) = visitor.request_id {
            if let Some(span) = ctx.span(id) {
                span.extensions_mut().insert(CaptureScope(request_id));
            }
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(scope) = ctx.event_scope(event) else {
            return;
        };

        // Nearest enclosing span that carries a request id wins.
        let request_id = scope.into_iter().find_map(|span| {
            span.extensions()
                .get::<CaptureScope>()
                .map(|s| s.0.clone())
        });
        let Some(request_id) = request_id else {
            return;
        };

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let record = LogRecord {
            timestamp: Utc::now(),
            level: event.metadata().level().to_string(),
            message: visitor.into_message(),
        };

        let buffers = self.buffers.read().expect("capture registry poisoned");
        if let Some(buffer) = buffers.get(&request_id) {
            buffer.lock().expect("capture buffer poisoned").push(record);
        }
    }
}

#[cfg(test)]
impl DiagnosticCapture {
    /// Inject a record directly, bypassing the subscriber stack.
    fn record_for_test(&self, request_id: &str, record: LogRecord) {
        let buffers = self.buffers.read().expect("capture registry poisoned");
        if let Some(buffer) = buffers.get(request_id) {
            buffer.lock().expect("capture buffer poisoned").push(record);
        }
    }
}
