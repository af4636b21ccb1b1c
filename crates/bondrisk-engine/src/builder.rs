//! Builder pattern for the risk service.

use std::sync::Arc;

use bondrisk_analytics::{RiskCalculator, YieldCurveProvider};
use bondrisk_core::YieldCurve;
use bondrisk_traits::{CacheBackend, IdentityStore, PortfolioStore};

use crate::cache::CacheCoordinator;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::service::RiskService;

/// Builder for constructing a [`RiskService`].
#[derive(Default)]
pub struct RiskServiceBuilder {
    config: Option<EngineConfig>,
    identity: Option<Arc<dyn IdentityStore>>,
    portfolios: Option<Arc<dyn PortfolioStore>>,
    cache_backend: Option<Arc<dyn CacheBackend>>,
    curve: Option<YieldCurve>,
    clock: Option<Arc<dyn Clock>>,
}

impl RiskServiceBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the identity store.
    pub fn with_identity(mut self, identity: Arc<dyn IdentityStore>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Set the portfolio store.
    pub fn with_portfolios(mut self, portfolios: Arc<dyn PortfolioStore>) -> Self {
        self.portfolios = Some(portfolios);
        self
    }

    /// Set the cache backend.
    pub fn with_cache_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.cache_backend = Some(backend);
        self
    }

    /// Set the initial live curve.
    pub fn with_curve(mut self, curve: YieldCurve) -> Self {
        self.curve = Some(curve);
        self
    }

    /// Set the clock. Defaults to the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the service.
    pub fn build(self) -> Result<RiskService, EngineError> {
        let config = self.config.unwrap_or_default();
        config.cache.validate()?;

        let identity = self
            .identity
            .ok_or_else(|| EngineError::Config("identity store is required".into()))?;
        let portfolios = self
            .portfolios
            .ok_or_else(|| EngineError::Config("portfolio store is required".into()))?;
        let backend = self
            .cache_backend
            .ok_or_else(|| EngineError::Config("cache backend is required".into()))?;
        let curve = self
            .curve
            .ok_or_else(|| EngineError::Config("initial yield curve is required".into()))?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let calculator = RiskCalculator::new(&config.analytics)?;
        let curves = Arc::new(YieldCurveProvider::with_timestamp(curve, clock.now())?);
        let cache = CacheCoordinator::new(backend, clock.clone(), config.cache);

        Ok(RiskService::new(
            identity, portfolios, curves, calculator, cache, clock,
        ))
    }
}
