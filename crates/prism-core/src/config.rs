//! Runtime configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level configuration for the core runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Traversal-cache settings.
    pub cache: CacheConfig,
    /// Streaming-buffer settings.
    pub stream: StreamConfig,
}

impl CoreConfig {
    /// Parse a configuration from JSON. Unknown fields are rejected so
    /// typos surface at startup rather than as silent defaults.
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|e| Error::backend(format!("bad config: {e}")))
    }
}

/// Traversal-cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Default validity window, in seconds, for entries that do not set
    /// their own.
    pub default_valid_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_valid_secs: crate::entry::DEFAULT_VALID.as_secs(),
        }
    }
}

impl CacheConfig {
    /// The default validity window as a duration.
    pub fn default_valid(&self) -> Duration {
        Duration::from_secs(self.default_valid_secs)
    }
}

/// Streaming-buffer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    /// How long, in seconds, a terminated stream buffer stays reusable
    /// before a new open relaunches its source.
    pub freshness_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { freshness_secs: 30 }
    }
}

impl StreamConfig {
    /// The freshness window as a duration.
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }
}
