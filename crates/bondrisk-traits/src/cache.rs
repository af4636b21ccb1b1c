//! Cache backend collaborator.
//!
//! A plain byte-oriented key/value store with per-entry TTLs (Redis,
//! memcached, an in-process map). Implementations may be slow or
//! unavailable; callers bound every call with a timeout and treat any error
//! as a miss.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TraitError;

/// Best-effort key/value cache.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Fetch the bytes stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, TraitError>;

    /// Store bytes under `key` for at most `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), TraitError>;

    /// Remove `key`. Returns `true` if something was removed.
    async fn delete(&self, key: &str) -> Result<bool, TraitError>;
}
