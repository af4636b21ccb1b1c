//! # Bondrisk Engine
//!
//! Cache-coordinated risk service for bondrisk.
//!
//! This crate provides:
//! - [`RiskService`]: the exposed operations (identity, market data,
//!   portfolios, risk, stress, export)
//! - [`CacheCoordinator`]: cache-aside with TTL classes and tag invalidation
//! - [`RiskServiceBuilder`]: explicit composition root
//!
//! ## Usage
//!
//! ```ignore
//! let service = RiskServiceBuilder::new()
//!     .with_identity(identity)
//!     .with_portfolios(portfolios)
//!     .with_cache_backend(cache)
//!     .with_curve(curve)
//!     .with_config(config)
//!     .build()?;
//!
//! let risk = service.calculate_risk(portfolio_id).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod keys;
pub mod service;

pub use builder::RiskServiceBuilder;
pub use cache::{CacheCoordinator, CacheStats, Ticket};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CachePolicy, EngineConfig};
pub use error::EngineError;
pub use keys::{CacheKey, EntityTag, Metric, TtlClass};
pub use service::{
    PortfolioView, RiskService, ServiceStatus, YieldCurveView, DEFAULT_PORTFOLIO_NAME,
};
