//! Tubenote Services
//!
//! Capability interfaces the orchestrator depends on, and their concrete
//! implementations: secret retrieval, video summarization, document store
//! writing, store-config resolution, and the notification channel. The
//! orchestrator only ever sees the traits.

pub mod notify;
pub mod secrets;
pub mod store;
pub mod store_config;
pub mod summarizer;

pub use notify::{LogChannel, NotificationAttachment, NotificationChannel, SmtpChannel};
pub use secrets::{EnvSecretProvider, SecretProvider};
pub use store::{DocumentStore, NotionStore};
pub use store_config::{StoreConfig, StoreConfigResolver};
pub use summarizer::{GeminiSummarizer, VideoSummarizer};
