//! Semantic response caching service
//!
//! Wraps an expensive backend with a two-layer cache: an exact layer keyed by
//! the normalized request and a semantic layer matching requests whose
//! embeddings are similar enough. Concurrent identical misses share a single
//! backend call.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::backend::Backend;
use crate::domain::cache::{
    CacheConfig, CacheEntry, CacheKey, CacheKeyNormalizer, CacheOutcome, CacheStatistics,
    CacheStrategy, HitSource, SemanticIndex, SemanticMatch, StatisticsSnapshot,
};
use crate::domain::embedding::Embedder;
use crate::domain::CacheError;
use crate::infrastructure::cache::{
    EvictionManager, ExactMatchIndex, FlightRole, LinearSemanticIndex, SingleFlight,
    SweeperHandle,
};

/// Wrap `backend` in a semantic cache
///
/// The returned service is itself a [`Backend`], so it can stand in wherever
/// the bare backend was used.
pub fn cached(
    backend: Arc<dyn Backend>,
    embedder: Option<Arc<dyn Embedder>>,
    config: CacheConfig,
) -> Result<SemanticCacheService, CacheError> {
    let mut builder = SemanticCacheService::builder(backend).config(config);

    if let Some(embedder) = embedder {
        builder = builder.embedder(embedder);
    }

    builder.build()
}

/// Builder for [`SemanticCacheService`]
#[derive(Debug)]
pub struct SemanticCacheBuilder {
    backend: Arc<dyn Backend>,
    embedder: Option<Arc<dyn Embedder>>,
    semantic_index: Option<Arc<dyn SemanticIndex>>,
    config: CacheConfig,
}

impl SemanticCacheBuilder {
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Replace the default linear-scan semantic index
    pub fn semantic_index(mut self, index: Arc<dyn SemanticIndex>) -> Self {
        self.semantic_index = Some(index);
        self
    }

    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and assemble the cache
    pub fn build(self) -> Result<SemanticCacheService, CacheError> {
        self.config.validate()?;

        let exact = Arc::new(ExactMatchIndex::new());
        let semantic = self
            .semantic_index
            .unwrap_or_else(|| Arc::new(LinearSemanticIndex::new()));
        let stats = Arc::new(CacheStatistics::new());
        let eviction = Arc::new(EvictionManager::new(
            Arc::clone(&exact),
            Arc::clone(&semantic),
            Arc::clone(&stats),
            self.config.max_entries,
        ));

        if self.embedder.is_none() && self.config.strategy.uses_semantic() {
            warn!(
                strategy = ?self.config.strategy,
                "No embedder configured, semantic lookups will degrade to exact-only"
            );
        }

        Ok(SemanticCacheService {
            inner: Arc::new(CacheCore {
                config: self.config,
                backend: self.backend,
                embedder: self.embedder,
                normalizer: CacheKeyNormalizer::new(),
                exact,
                semantic,
                eviction,
                single_flight: SingleFlight::new(),
                stats,
                sequence: AtomicU64::new(0),
            }),
        })
    }
}

/// Semantic cache in front of a backend
///
/// Cheap to clone; clones share the same entries and statistics.
#[derive(Debug, Clone)]
pub struct SemanticCacheService {
    inner: Arc<CacheCore>,
}

#[derive(Debug)]
struct CacheCore {
    config: CacheConfig,
    backend: Arc<dyn Backend>,
    embedder: Option<Arc<dyn Embedder>>,
    normalizer: CacheKeyNormalizer,
    exact: Arc<ExactMatchIndex>,
    semantic: Arc<dyn SemanticIndex>,
    eviction: Arc<EvictionManager>,
    single_flight: SingleFlight<Arc<str>>,
    stats: Arc<CacheStatistics>,
    sequence: AtomicU64,
}

/// Result of the lookup phase
struct Lookup {
    hit: Option<CacheOutcome>,
    /// Request embedding, when one was computed
    embedding: Option<Vec<f32>>,
}

impl SemanticCacheService {
    pub fn builder(backend: Arc<dyn Backend>) -> SemanticCacheBuilder {
        SemanticCacheBuilder {
            backend,
            embedder: None,
            semantic_index: None,
            config: CacheConfig::default(),
        }
    }

    /// Create a cache with the given collaborators and configuration
    pub fn new(
        backend: Arc<dyn Backend>,
        embedder: Arc<dyn Embedder>,
        config: CacheConfig,
    ) -> Result<Self, CacheError> {
        Self::builder(backend).embedder(embedder).config(config).build()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Get a response for `request`, from cache when possible
    pub async fn call(&self, request: &str) -> Result<String, CacheError> {
        Ok(self.call_detailed(request).await?.into_response())
    }

    /// Like [`call`](Self::call), also reporting where the response came from
    ///
    /// Only backend failures are returned; embedding failures degrade the
    /// request to exact-only matching.
    pub async fn call_detailed(&self, request: &str) -> Result<CacheOutcome, CacheError> {
        self.call_inner(request, None).await
    }

    /// Like [`call_detailed`](Self::call_detailed) with a caller-supplied
    /// embedding, skipping the embedder for this request
    pub async fn call_with_embedding(
        &self,
        request: &str,
        embedding: Vec<f32>,
    ) -> Result<CacheOutcome, CacheError> {
        self.call_inner(request, Some(embedding)).await
    }

    async fn call_inner(
        &self,
        request: &str,
        embedding: Option<Vec<f32>>,
    ) -> Result<CacheOutcome, CacheError> {
        let core = &self.inner;

        if !core.config.enabled {
            core.stats.record_bypass();
            let response = core.backend.invoke(request).await?;

            return Ok(CacheOutcome::new(response.into(), HitSource::Bypassed));
        }

        let key = core.normalizer.normalize(request);
        let lookup = core.lookup(&key, request, embedding).await;

        if let Some(outcome) = lookup.hit {
            return Ok(outcome);
        }

        core.compute(key, request, lookup.embedding).await
    }

    /// Look up `request` without invoking the backend on a miss
    ///
    /// Counts hits and misses like [`call`](Self::call). Always `None` while
    /// the cache is disabled.
    pub async fn lookup(&self, request: &str) -> Option<CacheOutcome> {
        let core = &self.inner;

        if !core.config.enabled {
            return None;
        }

        let key = core.normalizer.normalize(request);

        core.lookup(&key, request, None).await.hit
    }

    /// Whether a live entry exists under `request`'s exact key
    ///
    /// Does not touch statistics or access times.
    pub fn contains(&self, request: &str) -> bool {
        let key = self.inner.normalizer.normalize(request);

        self.inner
            .exact
            .get(&key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Current statistics
    pub fn statistics(&self) -> StatisticsSnapshot {
        self.inner.stats.snapshot(self.inner.exact.len())
    }

    /// Drop every entry and reset the counters
    pub fn clear(&self) {
        let core = &self.inner;

        // Exact first: a store racing this clear either sees its entry gone
        // from the exact index and withdraws it, or is wiped by the second step.
        core.exact.clear();
        core.semantic.clear();
        core.stats.reset();

        info!("Semantic cache cleared");
    }

    /// Remove all expired entries now, returning how many were removed
    pub fn evict_expired(&self) -> usize {
        self.inner.eviction.sweep_expired()
    }

    /// Start the periodic expiry sweep at the configured interval
    ///
    /// Must be called from within a tokio runtime. The sweep stops when the
    /// handle or every clone of this service is dropped.
    pub fn start_sweeper(&self) -> SweeperHandle {
        self.inner
            .eviction
            .spawn_sweeper(self.inner.config.sweep_interval())
    }

    /// Number of stored entries, aliases included
    pub fn len(&self) -> usize {
        self.inner.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.exact.is_empty()
    }
}

impl CacheCore {
    fn strategy(&self) -> CacheStrategy {
        self.config.strategy
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Run the exact and semantic layers for an already normalized key
    async fn lookup(&self, key: &CacheKey, request: &str, provided: Option<Vec<f32>>) -> Lookup {
        let started = Instant::now();
        let lookup = self.lookup_layers(key, request, provided).await;
        self.stats.record_lookup_time(started.elapsed());

        match &lookup.hit {
            Some(outcome) => debug!(key = %key, source = ?outcome.source, "Cache hit"),
            None => {
                self.stats.record_miss();
                debug!(key = %key, "Cache miss");
            }
        }

        lookup
    }

    async fn lookup_layers(
        &self,
        key: &CacheKey,
        request: &str,
        provided: Option<Vec<f32>>,
    ) -> Lookup {
        let strategy = self.strategy();

        if strategy.uses_exact() {
            if let Some(outcome) = self.exact_lookup(key) {
                return Lookup {
                    hit: Some(outcome),
                    embedding: None,
                };
            }
        }

        if !strategy.uses_semantic() {
            return Lookup {
                hit: None,
                embedding: None,
            };
        }

        let embedding = match provided {
            Some(embedding) => Some(embedding),
            None => self.embed(request).await,
        };

        let Some(embedding) = embedding else {
            // Degraded to exact-only for this request.
            let hit = if strategy.uses_exact() {
                None
            } else {
                self.exact_lookup(key)
            };

            return Lookup {
                hit,
                embedding: None,
            };
        };

        let hit = self.semantic_lookup(&embedding).map(|found| {
            self.stats.record_semantic_hit();
            found.entry.record_hit();

            if strategy == CacheStrategy::Hybrid && found.entry.key() != key {
                self.store_alias(&found.entry, key, request);
            }

            CacheOutcome::new(
                Arc::clone(found.entry.response()),
                HitSource::Semantic {
                    similarity: found.similarity,
                },
            )
        });

        Lookup {
            hit,
            embedding: Some(embedding),
        }
    }

    fn exact_lookup(&self, key: &CacheKey) -> Option<CacheOutcome> {
        let entry = self.exact.get(key)?;

        if self.eviction.evict_if_expired(&entry) {
            return None;
        }

        entry.record_hit();
        self.stats.record_exact_hit();

        Some(CacheOutcome::new(
            Arc::clone(entry.response()),
            HitSource::Exact,
        ))
    }

    fn semantic_lookup(&self, embedding: &[f32]) -> Option<SemanticMatch> {
        loop {
            let found = self
                .semantic
                .query(embedding, self.config.similarity_threshold)?;

            if !self.exact.holds(&found.entry) {
                self.semantic.remove_entry(&found.entry);
                continue;
            }

            if !self.eviction.evict_if_expired(&found.entry) {
                return Some(found);
            }
        }
    }

    async fn embed(&self, request: &str) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;

        match embedder.embed(request).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                self.stats.record_embedding_failure();
                warn!(
                    provider = embedder.provider_name(),
                    error = %e,
                    "Embedding failed, falling back to exact matching"
                );
                None
            }
        }
    }

    /// Make an exact hit of a request that was answered semantically
    fn store_alias(&self, source: &Arc<CacheEntry>, key: &CacheKey, request: &str) {
        let alias = CacheEntry::alias_of(source, key.clone(), request)
            .with_sequence(self.next_sequence());

        if let Some(replaced) = self.exact.put(Arc::new(alias)) {
            self.semantic.remove_entry(&replaced);
        }

        self.eviction.enforce_capacity();
    }

    async fn compute(
        self: &Arc<Self>,
        key: CacheKey,
        request: &str,
        embedding: Option<Vec<f32>>,
    ) -> Result<CacheOutcome, CacheError> {
        let core = Arc::clone(self);
        let request_text = request.to_string();
        let flight_key = key.clone();

        let (result, role) = self
            .single_flight
            .execute_once(&flight_key, move || async move {
                core.compute_and_store(key, request_text, embedding).await
            })
            .await;

        if role == FlightRole::Follower {
            self.stats.record_deduped_wait();
        }

        let response = result.map_err(|e| {
            warn!(key = %flight_key, error = %e, "Backend call failed");

            match e {
                CacheError::Backend { .. } => e,
                other => CacheError::backend(other.to_string()),
            }
        })?;

        let source = match role {
            FlightRole::Leader => HitSource::Computed,
            FlightRole::Follower => HitSource::Joined,
        };

        Ok(CacheOutcome::new(response, source))
    }

    /// Invoke the backend and store the result; runs once per in-flight key
    async fn compute_and_store(
        &self,
        key: CacheKey,
        request: String,
        embedding: Option<Vec<f32>>,
    ) -> Result<Arc<str>, CacheError> {
        let response: Arc<str> = self.backend.invoke(&request).await?.into();

        let started = Instant::now();
        let mut entry = CacheEntry::new(key, request, Arc::clone(&response), self.config.ttl())
            .with_sequence(self.next_sequence());

        if let Some(embedding) = embedding {
            entry = entry.with_embedding(embedding);
        }

        let entry = Arc::new(entry);

        if let Some(replaced) = self.exact.put(Arc::clone(&entry)) {
            self.semantic.remove_entry(&replaced);
        }

        if self.semantic.insert(Arc::clone(&entry)) && !self.exact.holds(&entry) {
            // Cleared or evicted between the two inserts.
            self.semantic.remove_entry(&entry);
        }

        self.eviction.enforce_capacity();
        self.stats.record_store_time(started.elapsed());

        Ok(response)
    }
}

#[async_trait]
impl Backend for SemanticCacheService {
    async fn invoke(&self, request: &str) -> Result<String, CacheError> {
        self.call(request).await
    }
}
