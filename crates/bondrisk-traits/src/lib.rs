//! # Bondrisk Traits
//!
//! Trait definitions for everything the risk engine consumes but does not own.
//!
//! This crate contains trait definitions only. Implementations live in the
//! extension crates (`bondrisk-ext-file`, `bondrisk-ext-redb`).
//!
//! ## Module Structure
//!
//! - [`identity`]: Credential resolution and user lifecycle
//! - [`storage`]: Portfolio persistence
//! - [`cache`]: Key/value cache backend with TTLs
//! - [`market_data`]: Yield curve sources
//!
//! ## Dependency Injection
//!
//! ```ignore
//! RiskServiceBuilder::new()
//!     .with_identity(impl IdentityStore)
//!     .with_portfolios(impl PortfolioStore)
//!     .with_cache_backend(impl CacheBackend)
//!     .with_curve(initial_curve)
//!     .build()
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod error;
pub mod identity;
pub mod market_data;
pub mod storage;

// Re-export commonly used types
pub use cache::CacheBackend;
pub use error::TraitError;
pub use identity::IdentityStore;
pub use market_data::CurveSource;
pub use storage::PortfolioStore;
