//! Semantic index contract

use std::fmt::Debug;
use std::sync::Arc;

use super::{CacheEntry, CacheKey};

/// Best semantic candidate for a query embedding
#[derive(Debug, Clone)]
pub struct SemanticMatch {
    pub entry: Arc<CacheEntry>,
    /// Cosine similarity in [-1, 1]
    pub similarity: f32,
}

impl SemanticMatch {
    pub fn new(entry: Arc<CacheEntry>, similarity: f32) -> Self {
        Self { entry, similarity }
    }
}

/// Nearest-neighbour lookup over cached entry embeddings
///
/// An auxiliary view of the exact index. An entry the exact index no longer
/// holds is stale; the cache drops such entries on lookup and on sweeps.
/// Implementations may trade the linear scan for an approximate index as
/// long as `query` keeps its contract.
pub trait SemanticIndex: Send + Sync + Debug {
    /// Entry with the highest similarity at or above `threshold`
    ///
    /// Ties within floating-point epsilon go to the most recently inserted
    /// entry. Malformed embeddings never match.
    fn query(&self, embedding: &[f32], threshold: f32) -> Option<SemanticMatch>;

    /// Add an entry, replacing any entry with the same key
    ///
    /// Returns false if the entry carries no usable embedding.
    fn insert(&self, entry: Arc<CacheEntry>) -> bool;

    /// Remove whatever entry is stored under `key`
    fn remove(&self, key: &CacheKey) -> bool;

    /// Remove `entry` only if it is still the one stored under its key
    fn remove_entry(&self, entry: &Arc<CacheEntry>) -> bool;

    /// Snapshot of every indexed entry, for consistency sweeps
    fn entries(&self) -> Vec<Arc<CacheEntry>>;

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
