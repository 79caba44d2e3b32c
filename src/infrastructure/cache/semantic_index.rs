//! Linear-scan semantic index

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::cache::{CacheEntry, CacheKey, SemanticIndex, SemanticMatch};
use crate::domain::embedding::cosine_similarity;

/// Semantic index comparing the query against every stored embedding
///
/// Suitable for a few thousand entries. Reads share the lock; inserts and
/// removals take it exclusively. Entries are immutable, so a poisoned lock
/// still guards consistent data and is recovered rather than propagated.
#[derive(Debug, Default)]
pub struct LinearSemanticIndex {
    entries: RwLock<HashMap<CacheKey, Arc<CacheEntry>>>,
}

impl LinearSemanticIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `candidate` should replace `best` as the query result
    fn is_better(candidate: &SemanticMatch, best: &SemanticMatch) -> bool {
        let difference = candidate.similarity - best.similarity;

        if difference.abs() <= f32::EPSILON {
            candidate.entry.sequence() > best.entry.sequence()
        } else {
            difference > 0.0
        }
    }
}

impl SemanticIndex for LinearSemanticIndex {
    fn query(&self, embedding: &[f32], threshold: f32) -> Option<SemanticMatch> {
        if embedding.is_empty() {
            return None;
        }

        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);

        entries
            .values()
            .filter_map(|entry| {
                let stored = entry.embedding()?;
                let similarity = cosine_similarity(embedding, stored)?;

                (similarity >= threshold).then(|| SemanticMatch::new(Arc::clone(entry), similarity))
            })
            .fold(None, |best: Option<SemanticMatch>, candidate| match best {
                Some(best) if !Self::is_better(&candidate, &best) => Some(best),
                _ => Some(candidate),
            })
    }

    fn insert(&self, entry: Arc<CacheEntry>) -> bool {
        if entry.embedding().is_none_or(|embedding| embedding.is_empty()) {
            return false;
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(entry.key().clone(), entry);

        true
    }

    fn remove(&self, key: &CacheKey) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        entries.remove(key).is_some()
    }

    fn remove_entry(&self, entry: &Arc<CacheEntry>) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        match entries.get(entry.key()) {
            Some(current) if Arc::ptr_eq(current, entry) => {
                entries.remove(entry.key());
                true
            }
            _ => false,
        }
    }

    fn entries(&self) -> Vec<Arc<CacheEntry>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
