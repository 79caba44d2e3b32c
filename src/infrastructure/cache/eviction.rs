//! TTL and capacity eviction

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::domain::cache::{CacheEntry, CacheStatistics, SemanticIndex};

use super::ExactMatchIndex;

/// Removes expired and over-capacity entries from both indexes
///
/// Invoked lazily by lookups, after every store, and periodically by the
/// background sweeper.
#[derive(Debug)]
pub struct EvictionManager {
    exact: Arc<ExactMatchIndex>,
    semantic: Arc<dyn SemanticIndex>,
    stats: Arc<CacheStatistics>,
    max_entries: usize,
}

impl EvictionManager {
    pub fn new(
        exact: Arc<ExactMatchIndex>,
        semantic: Arc<dyn SemanticIndex>,
        stats: Arc<CacheStatistics>,
        max_entries: usize,
    ) -> Self {
        Self {
            exact,
            semantic,
            stats,
            max_entries,
        }
    }

    /// Remove an entry from both indexes, counting it as an eviction
    ///
    /// No-op if the entry was already removed or replaced.
    pub fn evict(&self, entry: &Arc<CacheEntry>) -> bool {
        // Exact first, matching clear and replacement; a store racing this
        // removal then sees its entry gone and withdraws it.
        let removed = self.exact.remove_entry(entry);
        self.semantic.remove_entry(entry);

        if removed {
            self.stats.record_evictions(1);
        }

        removed
    }

    /// Evict `entry` if it has expired; returns whether it was expired
    pub fn evict_if_expired(&self, entry: &Arc<CacheEntry>) -> bool {
        if !entry.is_expired() {
            return false;
        }

        if self.evict(entry) {
            debug!(key = %entry.key(), "Evicted expired entry on lookup");
        }

        true
    }

    /// Remove every expired entry, returning how many were evicted
    ///
    /// Also drops semantic entries the exact index no longer holds.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();

        let evicted = self
            .exact
            .all()
            .iter()
            .filter(|entry| entry.is_expired_at(now))
            .filter(|entry| self.evict(entry))
            .count();

        self.prune_orphans();

        evicted
    }

    /// Remove semantic entries whose exact-index copy was cleared, evicted or
    /// replaced; these are not counted as evictions
    pub fn prune_orphans(&self) -> usize {
        let pruned = self
            .semantic
            .entries()
            .iter()
            .filter(|entry| !self.exact.holds(entry))
            .filter(|entry| self.semantic.remove_entry(entry))
            .count();

        if pruned > 0 {
            debug!(pruned, "Pruned semantic entries missing from the exact index");
        }

        pruned
    }

    /// Evict least-recently-accessed entries until within `max_entries`
    ///
    /// Expired entries go first; remaining TTL is otherwise ignored.
    pub fn enforce_capacity(&self) -> usize {
        let mut evicted = 0;

        while self.exact.len() > self.max_entries {
            let excess = self.exact.len().saturating_sub(self.max_entries);
            let now = Instant::now();

            let mut candidates = self.exact.all();
            candidates.sort_by_key(|entry| {
                (
                    !entry.is_expired_at(now),
                    entry.last_accessed_at(),
                    entry.sequence(),
                )
            });

            let removed = candidates
                .iter()
                .take(excess)
                .filter(|entry| self.evict(entry))
                .count();

            if removed == 0 {
                break;
            }

            evicted += removed;
        }

        if evicted > 0 {
            debug!(evicted, max_entries = self.max_entries, "Capacity eviction");
        }

        evicted
    }

    /// Start the periodic expiry sweep on the current tokio runtime
    ///
    /// The task holds only a weak reference and stops once the manager is
    /// dropped or the returned handle is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> SweeperHandle {
        let manager: Weak<Self> = Arc::downgrade(self);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let Some(manager) = manager.upgrade() else {
                    break;
                };

                let removed = manager.sweep_expired();

                if removed > 0 {
                    debug!(removed, "Periodic sweep evicted expired entries");
                }
            }

            info!("Cache sweeper stopped");
        });

        info!(interval_ms = interval.as_millis() as u64, "Cache sweeper started");

        SweeperHandle { task: Some(task) }
    }
}

/// Owns the background sweep task; dropping it stops the sweep
#[derive(Debug)]
pub struct SweeperHandle {
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop the sweep and wait for the task to finish
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
