//! Notification dispatch.
//!
//! Orchestration runs hand their terminal outcome to a bounded queue; a
//! single worker task drains it and drives the notification channel. The
//! hand-off never blocks, so a slow or failing channel cannot delay a
//! request reaching its terminal state. Channel failures are logged and
//! swallowed.

use std::sync::Arc;

use tokio::sync::mpsc;

use tubenote_core::models::{DiagnosticBundle, RequestOutcome, StructuredSummary};
use tubenote_services::{NotificationAttachment, NotificationChannel};

const QUEUE_CAPACITY: usize = 64;

#[derive(Debug)]
enum Notification {
    Success {
        title: String,
        brief: String,
        video_url: String,
        page_url: String,
    },
    Failure {
        subject: String,
        html: String,
        report: String,
    },
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<Notification>,
}

impl NotificationDispatcher {
    /// Spawn the delivery worker and return the dispatch handle.
    pub fn new(channel: Arc<dyn NotificationChannel>) -> Self {
        let (tx, mut rx) = mpsc::channel::<Notification>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                let (subject, html, attachment) = render(notification);
                if let Err(e) = channel.send(&subject, &html, attachment).await {
                    tracing::error!(error = %e, subject, "notification delivery failed");
                }
            }
        });

        Self { tx }
    }

    /// Queue a success notification. Never blocks; a full queue drops the
    /// notification with a log line.
    pub fn dispatch_success(&self, summary: &StructuredSummary, page_url: &str) {
        self.enqueue(Notification::Success {
            title: summary.display_title().to_string(),
            brief: summary.brief_summary.clone(),
            video_url: summary.url.clone(),
            page_url: page_url.to_string(),
        });
    }

    /// Queue a failure or partial-success notification with its diagnostic
    /// report attached.
    pub fn dispatch_failure(&self, outcome: &RequestOutcome, bundle: &DiagnosticBundle) {
        let (subject, detail) = match outcome {
            RequestOutcome::PartialSuccess { summary, store_error } => (
                format!("Video Summary Incomplete: {}", summary.display_title()),
                format!(
                    "The summary was generated but could not be persisted.<br>\
                     <strong>Store error:</strong> {store_error}"
                ),
            ),
            RequestOutcome::Failure { stage, kind, message } => (
                "Video Summary Failed".to_string(),
                format!(
                    "<strong>Stage:</strong> {stage}<br>\
                     <strong>Kind:</strong> {kind}<br>\
                     <strong>Error:</strong> {message}"
                ),
            ),
            RequestOutcome::Success { .. } => return,
        };

        let video_url = bundle
            .request
            .body
            .get("url")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        let html = format!(
            r#"<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <h2 style="color: #cc0000;">Video Summary Failed</h2>
  <p><strong>Video URL:</strong><br><a href="{video_url}">{video_url}</a></p>
  <p>{detail}</p>
  <p style="color: #666; font-size: 12px;">
    The full diagnostic report is attached.
  </p>
</body>
</html>"#
        );

        self.enqueue(Notification::Failure {
            subject,
            html,
            report: bundle.markdown_report(),
        });
    }

    fn enqueue(&self, notification: Notification) {
        if let Err(e) = self.tx.try_send(notification) {
            tracing::warn!(error = %e, "notification queue full, dropping notification");
        }
    }
}

fn render(notification: Notification) -> (String, String, Option<NotificationAttachment>) {
    match notification {
        Notification::Success {
            title,
            brief,
            video_url,
            page_url,
        } => {
            let subject = format!("Summary Ready: {title}");
            let html = format!(
                r#"<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <h2 style="color: #0066cc;">Video Summary Created</h2>
  <h3>{title}</h3>
  <p><strong>Summary:</strong><br>{brief}</p>
  <p>
    <a href="{page_url}"
       style="background-color: #0066cc; color: white; padding: 10px 20px;
              text-decoration: none; border-radius: 5px; display: inline-block;">
      View the page
    </a>
  </p>
  <p style="color: #666; font-size: 12px;">
    Original video: <a href="{video_url}">{video_url}</a>
  </p>
</body>
</html>"#
            );
            (subject, html, None)
        }
        Notification::Failure {
            subject,
            html,
            report,
        } => (
            subject,
            html,
            Some(NotificationAttachment {
                filename: "failure_report.md".to_string(),
                content_type: "text/markdown".to_string(),
                body: report,
            }),
        ),
    }
}
