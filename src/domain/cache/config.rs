//! Semantic cache configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::CacheError;

/// Which lookup layers a request goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategy {
    /// Hash-based lookup only
    ExactOnly,
    /// Vector similarity only
    SemanticOnly,
    /// Exact match first, then semantic
    #[default]
    Hybrid,
}

impl CacheStrategy {
    pub fn uses_exact(&self) -> bool {
        matches!(self, Self::ExactOnly | Self::Hybrid)
    }

    pub fn uses_semantic(&self) -> bool {
        matches!(self, Self::SemanticOnly | Self::Hybrid)
    }
}

/// Configuration for the semantic cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether caching is enabled; disabled caches pass every call through
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Minimum cosine similarity (inclusive) for a semantic hit
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Time-to-live for cached entries in milliseconds
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    #[serde(default)]
    pub strategy: CacheStrategy,

    /// Maximum number of live entries
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Interval of the background expiry sweep in milliseconds
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_similarity_threshold() -> f32 {
    0.90
}

fn default_ttl_ms() -> u64 {
    3_600_000
}

fn default_max_entries() -> usize {
    10_000
}

fn default_sweep_interval_ms() -> u64 {
    60_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            similarity_threshold: default_similarity_threshold(),
            ttl_ms: default_ttl_ms(),
            strategy: CacheStrategy::default(),
            max_entries: default_max_entries(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

impl CacheConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get TTL as Duration
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Get the sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the similarity threshold (not clamped, see [`CacheConfig::validate`])
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_ms = ttl.as_millis() as u64;
        self
    }

    pub fn with_strategy(mut self, strategy: CacheStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Rejects configurations the cache cannot run with
    pub fn validate(&self) -> Result<(), CacheError> {
        let threshold = self.similarity_threshold;

        if threshold.is_nan() || !(0.0..=1.0).contains(&threshold) {
            return Err(CacheError::configuration(format!(
                "similarity_threshold must be within [0, 1], got {}",
                threshold
            )));
        }

        if self.ttl_ms == 0 {
            return Err(CacheError::configuration("ttl must be positive"));
        }

        if self.max_entries == 0 {
            return Err(CacheError::configuration("max_entries must be at least 1"));
        }

        if self.sweep_interval_ms == 0 {
            return Err(CacheError::configuration("sweep_interval must be positive"));
        }

        Ok(())
    }
}
