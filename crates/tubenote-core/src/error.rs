//! Application error taxonomy.
//!
//! Every fallible operation in the workspace funnels into [`AppError`]. The
//! metadata methods (`http_status_code`, `error_code`, `is_recoverable`,
//! `log_level`) let the HTTP layer and the notifier act on errors without
//! matching on variants everywhere.

use thiserror::Error;

/// Store-config resolution failure. Variants are distinct so callers can
/// tell which remediation applies.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("remote configuration source unreachable: {0}")]
    RemoteUnreachable(String),
    #[error("no local configuration file at {0}")]
    MissingLocal(String),
    #[error("malformed configuration: {0}")]
    Malformed(String),
    #[error("incomplete configuration: {0}")]
    Incomplete(String),
}

#[derive(Debug, Clone, Error)]
pub enum SecretError {
    #[error("secret '{0}' not found")]
    NotFound(String),
    #[error("access to secret '{0}' denied: {1}")]
    Unauthorized(String, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Warn,
    Error,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid video URL: {0}")]
    InvalidUrl(String),

    #[error("rate limit exceeded: {count} requests in the current window (limit {limit})")]
    RateLimited { count: usize, limit: usize },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("summarizer error: {0}")]
    Summarizer(String),

    #[error("document store error: {0}")]
    Store(String),

    #[error("notification channel error: {0}")]
    Channel(String),

    #[error("secret error: {0}")]
    Secret(#[from] SecretError),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn http_status_code(&self) -> u16 {
        match self {
            AppError::InvalidUrl(_) | AppError::InvalidInput(_) => 400,
            AppError::Unauthorized(_) => 401,
            AppError::RateLimited { .. } => 429,
            AppError::Config(_) => 503,
            AppError::Summarizer(_)
            | AppError::Store(_)
            | AppError::Channel(_)
            | AppError::Secret(_)
            | AppError::Internal(_) => 500,
        }
    }

    /// Machine-readable code for clients and notifications.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidUrl(_) => "invalid_url",
            AppError::RateLimited { .. } => "rate_limited",
            AppError::Config(ConfigError::RemoteUnreachable(_)) => "config_unreachable",
            AppError::Config(ConfigError::MissingLocal(_)) => "config_missing",
            AppError::Config(ConfigError::Malformed(_)) => "config_malformed",
            AppError::Config(ConfigError::Incomplete(_)) => "config_incomplete",
            AppError::Summarizer(_) => "summarizer_error",
            AppError::Store(_) => "store_error",
            AppError::Channel(_) => "channel_error",
            AppError::Secret(SecretError::NotFound(_)) => "secret_not_found",
            AppError::Secret(SecretError::Unauthorized(..)) => "secret_unauthorized",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Internal(_) => "internal",
        }
    }

    /// Whether a retry of the same request could plausibly succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::RateLimited { .. }
            | AppError::Summarizer(_)
            | AppError::Store(_)
            | AppError::Channel(_)
            | AppError::Config(ConfigError::RemoteUnreachable(_)) => true,
            AppError::InvalidUrl(_)
            | AppError::InvalidInput(_)
            | AppError::Unauthorized(_)
            | AppError::Secret(_)
            | AppError::Internal(_)
            | AppError::Config(_) => false,
        }
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            AppError::InvalidUrl(_)
            | AppError::InvalidInput(_)
            | AppError::Unauthorized(_)
            | AppError::RateLimited { .. } => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}
