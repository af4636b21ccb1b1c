//! # Bondrisk File Extension
//!
//! Default collaborator implementations for development, tests and
//! single-process deployments:
//!
//! - [`InMemoryPortfolioStore`] and [`InMemoryIdentityStore`]
//! - [`InMemoryCacheBackend`], a process-local TTL map
//! - [`CsvCurveSource`] and [`StaticCurveSource`] for the live curve

#![warn(missing_docs)]

pub mod cache;
pub mod identity;
pub mod market_data;
pub mod portfolio;

pub use cache::InMemoryCacheBackend;
pub use identity::InMemoryIdentityStore;
pub use market_data::{CsvCurveSource, StaticCurveSource};
pub use portfolio::InMemoryPortfolioStore;

use std::sync::Arc;

/// In-memory stores and cache, ready to hand to the service builder.
pub struct InMemoryStores {
    /// Identity store.
    pub identity: Arc<InMemoryIdentityStore>,
    /// Portfolio store.
    pub portfolios: Arc<InMemoryPortfolioStore>,
    /// Cache backend.
    pub cache: Arc<InMemoryCacheBackend>,
}

/// Create empty in-memory stores and cache.
pub fn create_in_memory_stores() -> InMemoryStores {
    InMemoryStores {
        identity: Arc::new(InMemoryIdentityStore::new()),
        portfolios: Arc::new(InMemoryPortfolioStore::new()),
        cache: Arc::new(InMemoryCacheBackend::new()),
    }
}
