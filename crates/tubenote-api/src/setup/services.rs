//! Service initialization and application state setup

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use tubenote_core::Config;
use tubenote_infra::{CallbackSender, CallbackSenderConfig, DiagnosticCapture, SlidingWindowLimiter};
use tubenote_services::summarizer::GeminiSummarizerConfig;
use tubenote_services::store::NotionStoreConfig;
use tubenote_services::{
    DocumentStore, EnvSecretProvider, GeminiSummarizer, LogChannel, NotificationChannel,
    NotionStore, SecretProvider, SmtpChannel, StoreConfigResolver, VideoSummarizer,
};

use crate::notifier::NotificationDispatcher;
use crate::state::AppState;

/// Wire up every capability implementation and return the application state.
pub async fn initialize_services(config: &Config, capture: DiagnosticCapture) -> Result<AppState> {
    let secrets: Arc<dyn SecretProvider> = Arc::new(EnvSecretProvider::new());

    let summarizer: Arc<dyn VideoSummarizer> = Arc::new(GeminiSummarizer::new(
        secrets.clone(),
        GeminiSummarizerConfig {
            endpoint: config.summarizer_endpoint.clone(),
            model: config.summarizer_model.clone(),
            timeout_seconds: config.summarizer_timeout_seconds,
        },
    )?);

    let store: Arc<dyn DocumentStore> = Arc::new(NotionStore::new(
        secrets.clone(),
        NotionStoreConfig {
            endpoint: config.store_endpoint.clone(),
            timeout_seconds: config.store_timeout_seconds,
        },
    )?);

    let store_config = Arc::new(StoreConfigResolver::new(
        config.remote_config_url.clone(),
        config.store_config_path.clone(),
    ));
    if config.remote_config_url.is_some() {
        tracing::info!("store-config resolver initialized with remote source");
    } else {
        tracing::info!(
            path = %config.store_config_path.display(),
            "store-config resolver initialized in local-only mode"
        );
    }

    let channel: Arc<dyn NotificationChannel> = match &config.smtp {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, "SMTP notification channel enabled");
            Arc::new(SmtpChannel::new(smtp)?)
        }
        None => {
            tracing::info!("SMTP not configured, notifications are logged only");
            Arc::new(LogChannel)
        }
    };
    let notifier = NotificationDispatcher::new(channel);

    let callbacks = Arc::new(CallbackSender::new(CallbackSenderConfig {
        timeout_seconds: config.callback_timeout_seconds,
        signing_secret: config.callback_signing_secret.clone(),
        allow_private_hosts: config.callback_allow_private_hosts,
    })?);

    let limiter = SlidingWindowLimiter::new(
        Duration::from_secs(config.rate_limit_window_seconds),
        config.rate_limit_max_requests,
    );

    Ok(AppState {
        config: config.clone(),
        limiter,
        capture,
        summarizer,
        store,
        store_config,
        notifier,
        callbacks,
    })
}
