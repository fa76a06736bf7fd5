//! Store-config resolution.
//!
//! The destination-store field mapping lives outside the binary. Resolution
//! walks an ordered list of sources — in-memory cache, remote config
//! endpoint, local JSON file — where each source distinguishes "not
//! applicable" from "failed", so adding another source is a one-line change.
//! A successful load from any source populates the cache; until the cache is
//! cleared, resolution does no I/O.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use tubenote_core::error::ConfigError;

const PLACEHOLDER_DATABASE_ID: &str = "PASTE_YOUR_DATABASE_ID_HERE";

/// Mapping target for one logical field: a single store property or a list
/// of properties that all receive the value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyTarget {
    One(String),
    Many(Vec<String>),
}

impl PropertyTarget {
    pub fn names(&self) -> Vec<&str> {
        match self {
            PropertyTarget::One(name) => vec![name.as_str()],
            PropertyTarget::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// A property set to a fixed value on every created page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticProperty {
    pub property_name: String,
    pub value: String,
}

/// One section of the page body: which summary field it renders and under
/// which heading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSection {
    pub field: String,
    pub heading: String,
}

/// Destination-store configuration: container id plus the mapping from
/// logical summary fields to store property identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub database_id: String,
    #[serde(default)]
    pub database_name: Option<String>,
    #[serde(default)]
    pub property_mapping: HashMap<String, PropertyTarget>,
    #[serde(default)]
    pub static_properties: HashMap<String, StaticProperty>,
    #[serde(default)]
    pub content_sections: Vec<ContentSection>,
}

impl StoreConfig {
    /// Property names for a logical field, with a default when unmapped.
    pub fn targets_for<'a>(&'a self, field: &str, default: &'a str) -> Vec<&'a str> {
        match self.property_mapping.get(field) {
            Some(target) => target.names(),
            None => vec![default],
        }
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.database_id.is_empty() || self.database_id == PLACEHOLDER_DATABASE_ID {
            return Err(ConfigError::Incomplete(
                "database_id is not configured".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Result of asking one source for configuration.
enum SourceOutcome {
    Loaded(StoreConfig),
    /// The source is not configured in this deployment; silently skipped.
    NotApplicable,
    /// The source was tried and failed; resolution falls through but the
    /// failure is kept for the final error.
    Failed(ConfigError),
}

#[async_trait]
trait ConfigSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn load(&self) -> SourceOutcome;
}

struct RemoteSource {
    url: Option<String>,
    http: reqwest::Client,
}

#[async_trait]
impl ConfigSource for RemoteSource {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn load(&self) -> SourceOutcome {
        let Some(url) = &self.url else {
            return SourceOutcome::NotApplicable;
        };

        let response = match self.http.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                return SourceOutcome::Failed(ConfigError::RemoteUnreachable(e.to_string()));
            }
        };
        if !response.status().is_success() {
            return SourceOutcome::Failed(ConfigError::RemoteUnreachable(format!(
                "remote config returned {}",
                response.status()
            )));
        }
        match response.json::<StoreConfig>().await {
            Ok(config) => SourceOutcome::Loaded(config),
            Err(e) => SourceOutcome::Failed(ConfigError::Malformed(format!(
                "remote config: {e}"
            ))),
        }
    }
}

struct LocalFileSource {
    path: PathBuf,
}

#[async_trait]
impl ConfigSource for LocalFileSource {
    fn name(&self) -> &'static str {
        "local_file"
    }

    async fn load(&self) -> SourceOutcome {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return SourceOutcome::Failed(ConfigError::MissingLocal(
                    self.path.display().to_string(),
                ));
            }
            Err(e) => {
                return SourceOutcome::Failed(ConfigError::MissingLocal(format!(
                    "{}: {e}",
                    self.path.display()
                )));
            }
        };
        match serde_json::from_str::<StoreConfig>(&raw) {
            Ok(config) => SourceOutcome::Loaded(config),
            Err(e) => SourceOutcome::Failed(ConfigError::Malformed(format!(
                "{}: {e}",
                self.path.display()
            ))),
        }
    }
}

pub struct StoreConfigResolver {
    sources: Vec<Box<dyn ConfigSource>>,
    cache: RwLock<Option<Arc<StoreConfig>>>,
}

impl StoreConfigResolver {
    pub fn new(remote_url: Option<String>, local_path: PathBuf) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            sources: vec![
                Box::new(RemoteSource {
                    url: remote_url,
                    http,
                }),
                Box::new(LocalFileSource { path: local_path }),
            ],
            cache: RwLock::new(None),
        }
    }

    /// Resolve the store configuration, walking sources in order. O(1) with
    /// no I/O once the cache is populated.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self) -> Result<Arc<StoreConfig>, ConfigError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            tracing::debug!("using cached store configuration");
            return Ok(cached.clone());
        }

        let mut last_failure: Option<ConfigError> = None;
        for source in &self.sources {
            match source.load().await {
                SourceOutcome::Loaded(config) => {
                    let config = Arc::new(config.validate()?);
                    tracing::info!(
                        source = source.name(),
                        database = config.database_name.as_deref().unwrap_or("unknown"),
                        "store configuration loaded"
                    );
                    *self.cache.write().await = Some(config.clone());
                    return Ok(config);
                }
                SourceOutcome::NotApplicable => continue,
                SourceOutcome::Failed(error) => {
                    tracing::warn!(
                        source = source.name(),
                        error = %error,
                        "config source failed, falling through"
                    );
                    last_failure = Some(error);
                }
            }
        }

        Err(last_failure.unwrap_or_else(|| {
            ConfigError::MissingLocal("no configuration sources available".to_string())
        }))
    }

    /// Whether a configuration is currently cached.
    pub async fn is_cached(&self) -> bool {
        self.cache.read().await.is_some()
    }

    /// Drop the cached configuration; the next `resolve` hits the sources
    /// again.
    pub async fn clear_cache(&self) {
        *self.cache.write().await = None;
        tracing::info!("store configuration cache cleared");
    }
}
