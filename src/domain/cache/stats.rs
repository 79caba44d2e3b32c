//! Cache statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Lock-free counters shared by every cache operation
///
/// Writers never block readers; a snapshot may observe counters from
/// slightly different moments.
#[derive(Debug)]
pub struct CacheStatistics {
    exact_hits: AtomicU64,
    semantic_hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    deduped_waits: AtomicU64,
    embedding_failures: AtomicU64,
    bypassed: AtomicU64,
    lookup_micros: AtomicU64,
    lookups: AtomicU64,
    store_micros: AtomicU64,
    stores: AtomicU64,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl Default for CacheStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStatistics {
    pub fn new() -> Self {
        Self {
            exact_hits: AtomicU64::new(0),
            semantic_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            deduped_waits: AtomicU64::new(0),
            embedding_failures: AtomicU64::new(0),
            bypassed: AtomicU64::new(0),
            lookup_micros: AtomicU64::new(0),
            lookups: AtomicU64::new(0),
            store_micros: AtomicU64::new(0),
            stores: AtomicU64::new(0),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn record_exact_hit(&self) {
        self.exact_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_semantic_hit(&self) {
        self.semantic_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_deduped_wait(&self) {
        self.deduped_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_embedding_failure(&self) {
        self.embedding_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bypass(&self) {
        self.bypassed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lookup_time(&self, elapsed: Duration) {
        self.lookup_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_time(&self, elapsed: Duration) {
        self.store_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    /// Reset every counter; the start time is kept
    pub fn reset(&self) {
        for counter in [
            &self.exact_hits,
            &self.semantic_hits,
            &self.misses,
            &self.evictions,
            &self.deduped_waits,
            &self.embedding_failures,
            &self.bypassed,
            &self.lookup_micros,
            &self.lookups,
            &self.store_micros,
            &self.stores,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Take a point-in-time copy of the counters
    pub fn snapshot(&self, entries: usize) -> StatisticsSnapshot {
        let exact_hits = self.exact_hits.load(Ordering::Relaxed);
        let semantic_hits = self.semantic_hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);

        StatisticsSnapshot {
            exact_hits,
            semantic_hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            deduped_waits: self.deduped_waits.load(Ordering::Relaxed),
            embedding_failures: self.embedding_failures.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
            entries,
            avg_lookup_micros: average(
                self.lookup_micros.load(Ordering::Relaxed),
                self.lookups.load(Ordering::Relaxed),
            ),
            avg_store_micros: average(
                self.store_micros.load(Ordering::Relaxed),
                self.stores.load(Ordering::Relaxed),
            ),
            started_at: self.started_at,
            uptime_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}

fn average(total: u64, count: u64) -> u64 {
    if count == 0 { 0 } else { total / count }
}

/// Point-in-time view of cache statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub exact_hits: u64,
    pub semantic_hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Callers that joined another caller's in-flight computation
    pub deduped_waits: u64,
    /// Requests degraded to exact-only because embedding failed
    pub embedding_failures: u64,
    /// Calls passed straight through while the cache was disabled
    pub bypassed: u64,
    /// Stored entries at snapshot time, aliases included
    pub entries: usize,
    pub avg_lookup_micros: u64,
    pub avg_store_micros: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_ms: u64,
}

impl StatisticsSnapshot {
    pub fn total_hits(&self) -> u64 {
        self.exact_hits + self.semantic_hits
    }

    pub fn total_requests(&self) -> u64 {
        self.total_hits() + self.misses
    }

    /// Hits over hits plus misses, 0.0 when nothing was looked up
    pub fn hit_rate(&self) -> f64 {
        ratio(self.total_hits(), self.total_requests())
    }

    /// Share of hits served by the exact layer
    pub fn exact_match_rate(&self) -> f64 {
        ratio(self.exact_hits, self.total_hits())
    }

    /// Share of hits served by the semantic layer
    pub fn semantic_match_rate(&self) -> f64 {
        ratio(self.semantic_hits, self.total_hits())
    }
}

fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }

    part as f64 / total as f64
}
