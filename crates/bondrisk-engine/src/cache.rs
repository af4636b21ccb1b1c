//! Cache-aside coordination in front of a best-effort backend.
//!
//! Every entry is wrapped in an envelope carrying the [`Ticket`] its
//! computation started with and the tags it depends on. A read is served only
//! if the entry is younger than its TTL by the coordinator's clock, and no tag
//! it carries was invalidated after its ticket was issued. Backend trouble of
//! any kind (errors, timeouts, undecodable bytes) is logged and treated as a
//! miss.
//!
//! Ordering between computations and invalidations uses a monotonic
//! generation counter, never the clock, so a clock step cannot let a
//! superseded result through. Generations start at the coordinator's creation
//! time in microseconds so entries left behind by an earlier process sort
//! below any later invalidation.
//!
//! Concurrent misses for the same key each compute; there is no
//! single-flight. The invalidation watermarks are process-local.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use bondrisk_traits::{CacheBackend, TraitError};

use crate::clock::Clock;
use crate::config::CachePolicy;
use crate::keys::{CacheKey, EntityTag};

/// Writes between sweeps of the tracked-key index.
const PRUNE_EVERY_WRITES: u64 = 256;

/// Issued when a computation starts; orders it against invalidations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    started_at: DateTime<Utc>,
}

impl Ticket {
    /// When the computation started, by the coordinator clock.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// Stored form of a cached value.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    tags: Vec<EntityTag>,
    generation: u64,
    created_at: DateTime<Utc>,
    ttl_ms: u64,
    value: serde_json::Value,
}

/// Last invalidation of a tag.
#[derive(Debug, Clone, Copy)]
struct Watermark {
    generation: u64,
    at: DateTime<Utc>,
}

impl CacheEntry {
    fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + chrono::Duration::milliseconds(self.ttl_ms as i64)
    }
}

/// Counters exposed through the service status.
#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    invalidations: AtomicU64,
    backend_errors: AtomicU64,
}

/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Reads served from the backend.
    pub hits: u64,
    /// Reads that fell through to computation.
    pub misses: u64,
    /// Entries written.
    pub writes: u64,
    /// Tag invalidations performed.
    pub invalidations: u64,
    /// Backend errors and timeouts.
    pub backend_errors: u64,
}

/// Cache-aside coordinator.
pub struct CacheCoordinator {
    backend: Arc<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
    policy: CachePolicy,
    generation: AtomicU64,
    /// Latest invalidation per tag.
    watermarks: DashMap<EntityTag, Watermark>,
    /// Keys written per tag, with their expiry, so invalidation can delete them.
    tracked: DashMap<EntityTag, HashMap<String, DateTime<Utc>>>,
    counters: CacheCounters,
}

impl CacheCoordinator {
    /// Create a coordinator.
    pub fn new(backend: Arc<dyn CacheBackend>, clock: Arc<dyn Clock>, policy: CachePolicy) -> Self {
        let seed = u64::try_from(clock.now().timestamp_micros()).unwrap_or(0);
        Self {
            backend,
            clock,
            policy,
            generation: AtomicU64::new(seed),
            watermarks: DashMap::new(),
            tracked: DashMap::new(),
            counters: CacheCounters::default(),
        }
    }

    /// Name of the backend in use.
    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// The active policy.
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Start a computation whose result may be stored with [`put`](Self::put).
    pub fn begin(&self) -> Ticket {
        Ticket {
            generation: self.generation.load(Ordering::SeqCst),
            started_at: self.clock.now(),
        }
    }

    /// TTL applied to `key`.
    pub fn ttl_for(&self, key: &CacheKey) -> Duration {
        self.policy.ttl_for(key.metric().ttl_class())
    }

    /// Read a fresh value, or `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let rendered = key.render();
        let decoded = match self.lookup(&rendered).await {
            Some(value) => match serde_json::from_value(value) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!(key = %rendered, error = %e, "cached value has unexpected shape");
                    None
                }
            },
            None => None,
        };

        if decoded.is_some() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %rendered, "cache hit");
        } else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
        }
        decoded
    }

    async fn lookup(&self, rendered: &str) -> Option<serde_json::Value> {
        let bytes = self.call("get", rendered, self.backend.get(rendered)).await??;

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %rendered, error = %e, "discarding undecodable cache entry");
                self.evict(rendered).await;
                return None;
            }
        };

        if entry.key != rendered {
            warn!(key = %rendered, stored = %entry.key, "cache entry key mismatch");
            return None;
        }

        let now = self.clock.now();
        if now >= entry.expires_at() {
            debug!(key = %rendered, "cache entry expired");
            self.evict(rendered).await;
            return None;
        }

        if self.superseded(&entry.tags, entry.generation) {
            debug!(key = %rendered, "cache entry invalidated");
            self.evict(rendered).await;
            return None;
        }

        Some(entry.value)
    }

    /// Store `value`, computed from state read after `ticket` was issued.
    ///
    /// Writes for a computation that started before a later invalidation of
    /// any of its tags are skipped.
    pub async fn put<T: Serialize>(&self, key: &CacheKey, value: &T, ticket: Ticket) {
        let rendered = key.render();

        if self.superseded(key.tags(), ticket.generation) {
            debug!(key = %rendered, "skipping write for superseded computation");
            return;
        }

        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(key = %rendered, error = %e, "failed to encode cache value");
                return;
            }
        };

        let ttl = self.ttl_for(key);
        let entry = CacheEntry {
            key: rendered.clone(),
            tags: key.tags().to_vec(),
            generation: ticket.generation,
            created_at: ticket.started_at,
            ttl_ms: ttl.as_millis() as u64,
            value,
        };
        let bytes = match serde_json::to_vec(&entry) {
            Ok(b) => b,
            Err(e) => {
                warn!(key = %rendered, error = %e, "failed to encode cache entry");
                return;
            }
        };

        self.track(&entry);
        if self
            .call("set", &rendered, self.backend.set(&rendered, bytes, ttl))
            .await
            .is_some()
        {
            let written = self.counters.writes.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(key = %rendered, ttl_secs = ttl.as_secs(), "cache write");
            if written % PRUNE_EVERY_WRITES == 0 {
                self.prune(self.clock.now());
            }
        }
    }

    /// Serve `key` from cache or compute, store and return it.
    ///
    /// Only successful results are cached.
    pub async fn get_or_compute<T, E, F, Fut>(&self, key: &CacheKey, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }

        let ticket = self.begin();
        let value = compute().await?;
        self.put(key, &value, ticket).await;
        Ok(value)
    }

    /// Reject every entry carrying any of `tags` whose ticket was issued
    /// before this call.
    ///
    /// Returns once the watermarks are in place; later reads observe them.
    pub async fn invalidate(&self, tags: &[EntityTag]) {
        let now = self.clock.now();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut keys = Vec::new();
        for tag in tags {
            self.watermarks
                .entry(*tag)
                .and_modify(|w| {
                    w.generation = w.generation.max(generation);
                    w.at = now;
                })
                .or_insert(Watermark {
                    generation,
                    at: now,
                });
            if let Some((_, tracked)) = self.tracked.remove(tag) {
                keys.extend(tracked.into_keys());
            }
            debug!(tag = %tag, "invalidated");
        }
        self.counters
            .invalidations
            .fetch_add(tags.len() as u64, Ordering::Relaxed);

        keys.sort_unstable();
        keys.dedup();
        for key in keys {
            self.evict(&key).await;
        }

        self.prune(now);
    }

    /// Counter snapshot.
    pub fn stats(&self) -> CacheStats {
        let c = &self.counters;
        CacheStats {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            writes: c.writes.load(Ordering::Relaxed),
            invalidations: c.invalidations.load(Ordering::Relaxed),
            backend_errors: c.backend_errors.load(Ordering::Relaxed),
        }
    }

    fn superseded(&self, tags: &[EntityTag], generation: u64) -> bool {
        tags.iter().any(|tag| {
            self.watermarks
                .get(tag)
                .is_some_and(|w| w.generation > generation)
        })
    }

    fn track(&self, entry: &CacheEntry) {
        let expires_at = entry.expires_at();
        for tag in &entry.tags {
            self.tracked
                .entry(*tag)
                .or_default()
                .insert(entry.key.clone(), expires_at);
        }
    }

    /// Drop expired tracked keys across all tags, and watermarks older than
    /// the longest TTL.
    fn prune(&self, now: DateTime<Utc>) {
        self.tracked.retain(|_, keys| {
            keys.retain(|_, expires_at| *expires_at > now);
            !keys.is_empty()
        });

        let horizon = match chrono::Duration::from_std(self.policy.max_ttl()) {
            Ok(d) => now - d,
            Err(_) => return,
        };
        self.watermarks.retain(|_, w| w.at > horizon);
    }

    /// Number of keys currently tracked for invalidation.
    pub fn tracked_keys(&self) -> usize {
        self.tracked.iter().map(|keys| keys.len()).sum()
    }

    async fn evict(&self, rendered: &str) {
        let _ = self
            .call("delete", rendered, self.backend.delete(rendered))
            .await;
    }

    /// Run one backend call under the configured timeout.
    async fn call<T>(
        &self,
        op: &'static str,
        key: &str,
        fut: impl Future<Output = Result<T, TraitError>>,
    ) -> Option<T> {
        match tokio::time::timeout(self.policy.backend_timeout(), fut).await {
            Ok(Ok(v)) => Some(v),
            Ok(Err(e)) => {
                self.counters.backend_errors.fetch_add(1, Ordering::Relaxed);
                warn!(
                    backend = self.backend.backend_name(),
                    op,
                    key,
                    error = %e,
                    "cache backend error, treating as miss"
                );
                None
            }
            Err(_) => {
                self.counters.backend_errors.fetch_add(1, Ordering::Relaxed);
                warn!(
                    backend = self.backend.backend_name(),
                    op,
                    key,
                    timeout_ms = self.policy.backend_timeout_ms,
                    "cache backend timed out, treating as miss"
                );
                None
            }
        }
    }
}
