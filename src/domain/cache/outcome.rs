//! Result of a cache call

use std::sync::Arc;

/// Where a response came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitSource {
    /// Identical normalized request was cached
    Exact,
    /// A cached request was similar enough
    Semantic { similarity: f32 },
    /// This caller invoked the backend
    Computed,
    /// This caller waited on another caller's backend invocation
    Joined,
    /// Caching is disabled, the backend was called directly
    Bypassed,
}

impl HitSource {
    /// Whether the response was served without a backend call for this request
    pub fn is_cache_hit(&self) -> bool {
        matches!(self, Self::Exact | Self::Semantic { .. })
    }
}

/// A response together with how it was obtained
#[derive(Debug, Clone)]
pub struct CacheOutcome {
    pub response: Arc<str>,
    pub source: HitSource,
}

impl CacheOutcome {
    pub fn new(response: Arc<str>, source: HitSource) -> Self {
        Self { response, source }
    }

    pub fn into_response(self) -> String {
        self.response.to_string()
    }
}
