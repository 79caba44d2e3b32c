//! Cache entry type

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::CacheKey;

/// A cached backend response
///
/// Immutable once stored except for the access bookkeeping, which is kept in
/// atomics so a hit never copies the response payload.
#[derive(Debug)]
pub struct CacheEntry {
    key: CacheKey,
    /// Request text that produced this entry
    request_text: String,
    /// Embedding of the request, if one was computed
    embedding: Option<Vec<f32>>,
    response: Arc<str>,
    created_at: Instant,
    /// Fixed at insertion, never renewed on access
    expires_at: Instant,
    /// Monotonic insertion order, used as a tie-breaker
    sequence: u64,
    /// Nanoseconds between `created_at` and the last access
    last_accessed_offset: AtomicU64,
    hit_count: AtomicU64,
}

impl CacheEntry {
    /// Create a new entry that expires `ttl` from now
    pub fn new(
        key: CacheKey,
        request_text: impl Into<String>,
        response: impl Into<Arc<str>>,
        ttl: Duration,
    ) -> Self {
        let now = Instant::now();

        Self {
            key,
            request_text: request_text.into(),
            embedding: None,
            response: response.into(),
            created_at: now,
            expires_at: now + ttl,
            sequence: 0,
            last_accessed_offset: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
        }
    }

    /// Create an alias entry under another key that shares `source`'s response
    ///
    /// The alias inherits the source's expiry so it never outlives the
    /// response it points at.
    pub fn alias_of(source: &CacheEntry, key: CacheKey, request_text: impl Into<String>) -> Self {
        let now = Instant::now();

        Self {
            key,
            request_text: request_text.into(),
            embedding: None,
            response: Arc::clone(&source.response),
            created_at: now,
            expires_at: source.expires_at.max(now),
            sequence: 0,
            last_accessed_offset: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn request_text(&self) -> &str {
        &self.request_text
    }

    pub fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }

    pub fn response(&self) -> &Arc<str> {
        &self.response
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn last_accessed_at(&self) -> Instant {
        self.created_at + Duration::from_nanos(self.last_accessed_offset.load(Ordering::Relaxed))
    }

    pub fn hit_count(&self) -> u64 {
        self.hit_count.load(Ordering::Relaxed)
    }

    /// Check if the entry has expired at `now`
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Record a successful lookup
    pub fn record_hit(&self) {
        let offset = Instant::now().saturating_duration_since(self.created_at);
        let offset = u64::try_from(offset.as_nanos()).unwrap_or(u64::MAX);

        self.last_accessed_offset.fetch_max(offset, Ordering::Relaxed);
        self.hit_count.fetch_add(1, Ordering::Relaxed);
    }
}
