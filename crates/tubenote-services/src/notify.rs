//! Notification channel.
//!
//! Delivery is best-effort by contract: a channel failure is reported to the
//! caller as an error, but the orchestrator never lets it affect a request's
//! terminal state. [`SmtpChannel`] mails HTML notifications with an optional
//! markdown attachment; [`LogChannel`] is the fallback when no SMTP host is
//! configured.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use tubenote_core::config::SmtpConfig;
use tubenote_core::AppError;

/// File attached to a notification (the diagnostic report on failures).
#[derive(Debug, Clone)]
pub struct NotificationAttachment {
    pub filename: String,
    pub content_type: String,
    pub body: String,
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(
        &self,
        subject: &str,
        html_body: &str,
        attachment: Option<NotificationAttachment>,
    ) -> Result<(), AppError>;
}

pub struct SmtpChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpChannel {
    pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
        let from: Mailbox = config
            .from_address
            .parse()
            .map_err(|e| AppError::Channel(format!("invalid sender address: {e}")))?;
        let to: Mailbox = config
            .to_address
            .parse()
            .map_err(|e| AppError::Channel(format!("invalid recipient address: {e}")))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| AppError::Channel(format!("SMTP relay setup failed: {e}")))?
            .port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }
}

#[async_trait]
impl NotificationChannel for SmtpChannel {
    #[tracing::instrument(skip(self, html_body, attachment))]
    async fn send(
        &self,
        subject: &str,
        html_body: &str,
        attachment: Option<NotificationAttachment>,
    ) -> Result<(), AppError> {
        let html = MultiPart::alternative_plain_html(
            strip_tags(html_body),
            html_body.to_string(),
        );

        let body = match attachment {
            Some(att) => {
                let content_type = ContentType::parse(&att.content_type)
                    .unwrap_or(ContentType::TEXT_PLAIN);
                MultiPart::mixed()
                    .multipart(html)
                    .singlepart(Attachment::new(att.filename).body(att.body, content_type))
            }
            None => MultiPart::mixed().multipart(html),
        };

        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .multipart(body)
            .map_err(|e| AppError::Channel(format!("failed to build message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Channel(format!("SMTP delivery failed: {e}")))?;

        tracing::info!(subject, "notification email sent");
        Ok(())
    }
}

/// Logging-only channel used when SMTP is not configured.
#[derive(Debug, Default)]
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn send(
        &self,
        subject: &str,
        _html_body: &str,
        attachment: Option<NotificationAttachment>,
    ) -> Result<(), AppError> {
        tracing::info!(
            subject,
            has_attachment = attachment.is_some(),
            "notification (log-only channel)"
        );
        Ok(())
    }
}

/// Crude plain-text rendering of the HTML body for the alternative part.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
