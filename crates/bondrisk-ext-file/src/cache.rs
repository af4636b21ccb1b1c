//! Process-local cache backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use bondrisk_traits::{CacheBackend, TraitError};

struct StoredValue {
    bytes: Vec<u8>,
    expires_at: Instant,
}

/// In-memory [`CacheBackend`] with per-entry expiry.
pub struct InMemoryCacheBackend {
    entries: DashMap<String, StoredValue>,
}

impl InMemoryCacheBackend {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if `key` is stored and not expired.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|v| v.expires_at > Instant::now())
    }

    /// Drop expired entries.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, v| v.expires_at > now);
    }
}

impl Default for InMemoryCacheBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    fn backend_name(&self) -> &'static str {
        "in-memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, TraitError> {
        let now = Instant::now();
        if let Some(v) = self.entries.get(key) {
            if v.expires_at > now {
                return Ok(Some(v.bytes.clone()));
            }
        }
        self.entries.remove_if(key, |_, v| v.expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), TraitError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| TraitError::InvalidInput(format!("ttl {ttl:?} out of range")))?;
        self.entries.insert(
            key.to_string(),
            StoredValue {
                bytes: value,
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, TraitError> {
        Ok(self.entries.remove(key).is_some())
    }
}
