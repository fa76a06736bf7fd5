//! Secret retrieval.
//!
//! The summarizer and store implementations never read credentials directly;
//! they go through [`SecretProvider`] so deployments can front the process
//! with whatever vault they use. The default implementation reads the
//! environment and caches values for the process lifetime.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use tubenote_core::error::SecretError;

#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn get_secret(&self, name: &str) -> Result<String, SecretError>;
}

/// Environment-backed secret provider with a process-lifetime cache.
#[derive(Default)]
pub struct EnvSecretProvider {
    cache: RwLock<HashMap<String, String>>,
}

impl EnvSecretProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretProvider for EnvSecretProvider {
    async fn get_secret(&self, name: &str) -> Result<String, SecretError> {
        if let Some(value) = self.cache.read().await.get(name) {
            return Ok(value.clone());
        }

        let value = std::env::var(name)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SecretError::NotFound(name.to_string()))?;

        tracing::debug!(secret = name, "secret resolved from environment");
        self.cache
            .write()
            .await
            .insert(name.to_string(), value.clone());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_and_caches_env_secret() {
        std::env::set_var("TUBENOTE_TEST_SECRET_A", "s3cr3t");
        let provider = EnvSecretProvider::new();
        assert_eq!(provider.get_secret("TUBENOTE_TEST_SECRET_A").await.unwrap(), "s3cr3t");

        // Cached value survives the variable being unset.
        std::env::remove_var("TUBENOTE_TEST_SECRET_A");
        assert_eq!(provider.get_secret("TUBENOTE_TEST_SECRET_A").await.unwrap(), "s3cr3t");
    }

    #[tokio::test]
    async fn missing_secret_is_not_found() {
        let provider = EnvSecretProvider::new();
        let err = provider.get_secret("TUBENOTE_TEST_SECRET_MISSING").await.unwrap_err();
        assert!(matches!(err, SecretError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_value_counts_as_missing() {
        std::env::set_var("TUBENOTE_TEST_SECRET_EMPTY", "");
        let provider = EnvSecretProvider::new();
        assert!(provider.get_secret("TUBENOTE_TEST_SECRET_EMPTY").await.is_err());
    }
}
