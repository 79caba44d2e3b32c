//! Domain layer - Core cache entities, collaborators and errors

pub mod backend;
pub mod cache;
pub mod embedding;
pub mod error;

pub use backend::Backend;
pub use cache::{
    CacheConfig, CacheEntry, CacheKey, CacheKeyNormalizer, CacheOutcome, CacheStatistics,
    CacheStrategy, HitSource, SemanticIndex, SemanticMatch, StatisticsSnapshot,
};
pub use embedding::{cosine_similarity, Embedder};
pub use error::CacheError;
