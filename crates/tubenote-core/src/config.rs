//! Environment-driven configuration.
//!
//! All settings are read once at startup via [`Config::from_env`]. A `.env`
//! file is honored in development; real deployments set the variables
//! directly.

use std::path::PathBuf;

use anyhow::{Context, Result};

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_opt(name) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid value for {name}")),
        None => Ok(default),
    }
}

/// SMTP delivery settings for the notification channel.
///
/// Optional as a block: when `SMTP_HOST` is unset, notifications are logged
/// instead of mailed.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub to_address: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub bind_address: String,
    /// Master API key for the protected routes. `None` disables auth
    /// (development only; a warning is logged at startup).
    pub master_api_key: Option<String>,
    pub max_body_bytes: usize,

    // Admission control
    pub rate_limit_window_seconds: u64,
    pub rate_limit_max_requests: usize,

    // Summarizer
    pub summarizer_endpoint: String,
    pub summarizer_model: String,
    pub summarizer_timeout_seconds: u64,

    // Document store
    pub store_endpoint: String,
    pub store_timeout_seconds: u64,

    // Store-config resolution
    pub remote_config_url: Option<String>,
    pub store_config_path: PathBuf,

    // Callbacks
    pub callback_timeout_seconds: u64,
    pub callback_signing_secret: Option<String>,
    pub callback_allow_private_hosts: bool,

    pub smtp: Option<SmtpConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let smtp = match env_opt("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: env_parse("SMTP_PORT", 587u16)?,
                username: env_or("SMTP_USERNAME", ""),
                password: env_or("SMTP_PASSWORD", ""),
                from_address: env_opt("NOTIFY_FROM_ADDRESS")
                    .context("NOTIFY_FROM_ADDRESS is required when SMTP_HOST is set")?,
                to_address: env_opt("NOTIFY_TO_ADDRESS")
                    .context("NOTIFY_TO_ADDRESS is required when SMTP_HOST is set")?,
            }),
            None => None,
        };

        Ok(Self {
            environment: env_or("ENVIRONMENT", "development"),
            bind_address: env_or("TUBENOTE_BIND", "0.0.0.0:8080"),
            master_api_key: env_opt("TUBENOTE_API_KEY"),
            max_body_bytes: env_parse("MAX_BODY_BYTES", 64 * 1024)?,
            rate_limit_window_seconds: env_parse("RATE_LIMIT_WINDOW_SECONDS", 3600)?,
            rate_limit_max_requests: env_parse("RATE_LIMIT_MAX_REQUESTS", 30)?,
            summarizer_endpoint: env_or(
                "SUMMARIZER_ENDPOINT",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            summarizer_model: env_or("SUMMARIZER_MODEL", "gemini-2.5-pro"),
            summarizer_timeout_seconds: env_parse("SUMMARIZER_TIMEOUT_SECONDS", 300)?,
            store_endpoint: env_or("STORE_ENDPOINT", "https://api.notion.com/v1"),
            store_timeout_seconds: env_parse("STORE_TIMEOUT_SECONDS", 30)?,
            remote_config_url: env_opt("REMOTE_CONFIG_URL"),
            store_config_path: PathBuf::from(env_or("STORE_CONFIG_PATH", "store_config.json")),
            callback_timeout_seconds: env_parse("CALLBACK_TIMEOUT_SECONDS", 30)?,
            callback_signing_secret: env_opt("CALLBACK_SIGNING_SECRET"),
            callback_allow_private_hosts: env_parse("CALLBACK_ALLOW_PRIVATE_HOSTS", false)?,
            smtp,
        })
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.as_str(), "production" | "prod")
    }
}

impl Default for Config {
    /// Defaults suitable for tests; production always goes through
    /// [`Config::from_env`].
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            bind_address: "127.0.0.1:8080".to_string(),
            master_api_key: None,
            max_body_bytes: 64 * 1024,
            rate_limit_window_seconds: 3600,
            rate_limit_max_requests: 30,
            summarizer_endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            summarizer_model: "gemini-2.5-pro".to_string(),
            summarizer_timeout_seconds: 300,
            store_endpoint: "https://api.notion.com/v1".to_string(),
            store_timeout_seconds: 30,
            remote_config_url: None,
            store_config_path: PathBuf::from("store_config.json"),
            callback_timeout_seconds: 30,
            callback_signing_secret: None,
            callback_allow_private_hosts: false,
            smtp: None,
        }
    }
}
