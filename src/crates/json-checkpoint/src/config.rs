//! Store configuration
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! path = "tmp/checkpoint.json"
//! serialize_writes = false
//! put_writes_policy = "ignore"   # or "strict"
//! pretty = false
//!
//! [retry]
//! max_attempts = 3
//! initial_delay_ms = 100
//! max_delay_ms = 5000
//! multiplier = 2.0
//! ```

use crate::error::{CheckpointError, Result};
use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// What `put_writes` does when the target checkpoint does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PutWritesPolicy {
    /// Silently drop the writes (logged at debug level)
    #[default]
    Ignore,
    /// Fail with [`CheckpointError::NotFound`]
    Strict,
}

/// Configuration for [`JsonFileCheckpointSaver`](crate::JsonFileCheckpointSaver)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backing file
    pub path: PathBuf,

    /// Retry policy for loads
    pub retry: RetryConfig,

    /// Hold a per-instance lock across load-mutate-save in `put` and
    /// `put_writes`. Without it, concurrent writers through the same saver can
    /// lose updates (last write wins at file granularity). It never protects
    /// against other processes or other saver instances on the same file.
    pub serialize_writes: bool,

    /// Behaviour of `put_writes` against a missing checkpoint
    pub put_writes_policy: PutWritesPolicy,

    /// Pretty-print the backing file
    pub pretty: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("checkpoints.json"),
            retry: RetryConfig::default(),
            serialize_writes: false,
            put_writes_policy: PutWritesPolicy::Ignore,
            pretty: false,
        }
    }
}

impl StoreConfig {
    /// Default configuration for the given backing file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_serialize_writes(mut self, serialize_writes: bool) -> Self {
        self.serialize_writes = serialize_writes;
        self
    }

    pub fn with_put_writes_policy(mut self, policy: PutWritesPolicy) -> Self {
        self.put_writes_policy = policy;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| CheckpointError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from a TOML file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| {
            CheckpointError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), store = %config.path.display(), "Loaded store config");
        Ok(config)
    }
}
