//! semcache
//!
//! A semantic response cache for expensive, slow backends:
//! - Exact matching on a normalized hash of the request
//! - Semantic matching on embedding cosine similarity
//! - Single-flight deduplication of concurrent identical misses
//! - TTL expiry and least-recently-accessed capacity eviction
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use semcache::{cached, Backend, CacheConfig, CacheError, HashingEmbedder};
//!
//! #[derive(Debug)]
//! struct Echo;
//!
//! #[async_trait::async_trait]
//! impl Backend for Echo {
//!     async fn invoke(&self, request: &str) -> Result<String, CacheError> {
//!         Ok(request.to_uppercase())
//!     }
//! }
//!
//! # async fn example() -> Result<(), CacheError> {
//! let cache = cached(
//!     Arc::new(Echo),
//!     Some(Arc::new(HashingEmbedder::default())),
//!     CacheConfig::default(),
//! )?;
//!
//! let answer = cache.call("hello").await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{
    Backend, CacheConfig, CacheError, CacheOutcome, CacheStrategy, Embedder, HitSource,
    StatisticsSnapshot,
};
pub use infrastructure::embedding::HashingEmbedder;
pub use infrastructure::services::{cached, SemanticCacheBuilder, SemanticCacheService};
