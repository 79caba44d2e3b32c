//! Exact-match index keyed by normalized request hash

use std::sync::Arc;

use dashmap::DashMap;

use crate::domain::cache::{CacheEntry, CacheKey};

/// Concurrent key to entry map
///
/// Sharded, so lookups on different keys never contend on a single lock.
/// The authoritative store: every live entry is reachable from here.
#[derive(Debug, Default)]
pub struct ExactMatchIndex {
    entries: DashMap<CacheKey, Arc<CacheEntry>>,
}

impl ExactMatchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry; a miss is `None`, never an error
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Insert an entry, returning the one it replaced
    pub fn put(&self, entry: Arc<CacheEntry>) -> Option<Arc<CacheEntry>> {
        self.entries.insert(entry.key().clone(), entry)
    }

    pub fn remove(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    /// Remove `entry` only if it has not been replaced in the meantime
    pub fn remove_entry(&self, entry: &Arc<CacheEntry>) -> bool {
        self.entries
            .remove_if(entry.key(), |_, current| Arc::ptr_eq(current, entry))
            .is_some()
    }

    /// Whether `entry` itself, not a replacement, is stored under its key
    pub fn holds(&self, entry: &Arc<CacheEntry>) -> bool {
        self.entries
            .get(entry.key())
            .is_some_and(|current| Arc::ptr_eq(current.value(), entry))
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Snapshot of every stored entry, for eviction sweeps
    pub fn all(&self) -> Vec<Arc<CacheEntry>> {
        self.entries
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::CacheKeyNormalizer;
    use std::time::Duration;

    fn entry(text: &str, response: &str) -> Arc<CacheEntry> {
        let key = CacheKeyNormalizer::new().normalize(text);
        Arc::new(CacheEntry::new(key, text, response, Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let index = ExactMatchIndex::new();
        let stored = entry("hello", "world");

        assert!(index.put(Arc::clone(&stored)).is_none());

        let found = index.get(stored.key()).unwrap();
        assert!(Arc::ptr_eq(&found, &stored));
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let index = ExactMatchIndex::new();
        let key = CacheKeyNormalizer::new().normalize("missing");

        assert!(index.get(&key).is_none());
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_put_replaces_same_key() {
        let index = ExactMatchIndex::new();
        let first = entry("Hello", "one");
        let second = entry("  hello ", "two");

        index.put(Arc::clone(&first));
        let replaced = index.put(Arc::clone(&second)).unwrap();

        assert!(Arc::ptr_eq(&replaced, &first));
        assert_eq!(index.len(), 1);
        assert_eq!(&**index.get(first.key()).unwrap().response(), "two");
    }

    #[tokio::test]
    async fn test_remove_entry_ignores_replaced_entries() {
        let index = ExactMatchIndex::new();
        let stale = entry("hello", "old");
        let fresh = entry("hello", "new");

        index.put(Arc::clone(&stale));
        index.put(Arc::clone(&fresh));

        assert!(!index.remove_entry(&stale));
        assert!(index.contains(fresh.key()));
        assert!(index.remove_entry(&fresh));
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_holds_only_the_stored_instance() {
        let index = ExactMatchIndex::new();
        let stale = entry("hello", "old");
        let fresh = entry("hello", "new");

        assert!(!index.holds(&stale));

        index.put(Arc::clone(&stale));
        assert!(index.holds(&stale));

        index.put(Arc::clone(&fresh));
        assert!(!index.holds(&stale));
        assert!(index.holds(&fresh));
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let index = ExactMatchIndex::new();
        let a = entry("a", "1");
        let b = entry("b", "2");

        index.put(Arc::clone(&a));
        index.put(Arc::clone(&b));

        assert!(index.remove(a.key()).is_some());
        assert!(index.remove(a.key()).is_none());
        assert_eq!(index.all().len(), 1);

        index.clear();
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        let index = Arc::new(ExactMatchIndex::new());

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let index = Arc::clone(&index);
                tokio::spawn(async move {
                    let stored = entry(&format!("request {}", i), "response");
                    index.put(Arc::clone(&stored));
                    index.get(stored.key()).is_some()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap());
        }

        assert_eq!(index.len(), 10);
    }
}
