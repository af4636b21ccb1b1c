//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use bondrisk_analytics::AnalyticsConfig;

use crate::error::EngineError;
use crate::keys::TtlClass;

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Calculator parameters.
    pub analytics: AnalyticsConfig,
    /// Cache policy.
    pub cache: CachePolicy,
}

/// TTLs and backend limits for the cache coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePolicy {
    /// TTL for rates and curves, in seconds.
    pub market_data_ttl_secs: u64,
    /// TTL for credential and user lookups, in seconds.
    pub identity_ttl_secs: u64,
    /// Upper TTL for portfolio-derived results, in seconds.
    pub portfolio_ttl_secs: u64,
    /// How often the live curve is refreshed, in seconds.
    pub curve_refresh_secs: u64,
    /// Maximum time to wait on any single backend call, in milliseconds.
    pub backend_timeout_ms: u64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            market_data_ttl_secs: 300,
            identity_ttl_secs: 3600,
            portfolio_ttl_secs: 900,
            curve_refresh_secs: 300,
            backend_timeout_ms: 250,
        }
    }
}

impl CachePolicy {
    /// Reject settings that would disable caching or stall the refresh loop.
    pub fn validate(&self) -> Result<(), EngineError> {
        let fields = [
            ("market_data_ttl_secs", self.market_data_ttl_secs),
            ("identity_ttl_secs", self.identity_ttl_secs),
            ("portfolio_ttl_secs", self.portfolio_ttl_secs),
            ("curve_refresh_secs", self.curve_refresh_secs),
            ("backend_timeout_ms", self.backend_timeout_ms),
        ];
        match fields.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(EngineError::Config(format!(
                "cache.{name} must be greater than zero"
            ))),
            None => Ok(()),
        }
    }

    /// TTL for a metric class.
    ///
    /// Portfolio-derived results depend on the curve, so they never outlive
    /// one refresh interval.
    pub fn ttl_for(&self, class: TtlClass) -> Duration {
        let secs = match class {
            TtlClass::MarketData => self.market_data_ttl_secs,
            TtlClass::Identity => self.identity_ttl_secs,
            TtlClass::PortfolioDerived => self.portfolio_ttl_secs.min(self.curve_refresh_secs),
        };
        Duration::from_secs(secs)
    }

    /// Longest TTL any entry can have.
    pub fn max_ttl(&self) -> Duration {
        [TtlClass::MarketData, TtlClass::Identity, TtlClass::PortfolioDerived]
            .into_iter()
            .map(|c| self.ttl_for(c))
            .max()
            .unwrap_or_default()
    }

    /// Backend call timeout.
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    /// Curve refresh interval.
    pub fn curve_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.curve_refresh_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttls() {
        let policy = CachePolicy::default();
        assert_eq!(policy.ttl_for(TtlClass::MarketData), Duration::from_secs(300));
        assert_eq!(policy.ttl_for(TtlClass::Identity), Duration::from_secs(3600));
        assert_eq!(policy.ttl_for(TtlClass::PortfolioDerived), Duration::from_secs(300));
        assert_eq!(policy.max_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_default_policy_is_valid() {
        assert!(CachePolicy::default().validate().is_ok());
    }

    #[test]
    fn test_zero_settings_rejected() {
        let zero_refresh = CachePolicy {
            curve_refresh_secs: 0,
            ..CachePolicy::default()
        };
        match zero_refresh.validate() {
            Err(EngineError::Config(msg)) => assert!(msg.contains("curve_refresh_secs")),
            other => panic!("expected config error, got {other:?}"),
        }

        let zero_ttl = CachePolicy {
            identity_ttl_secs: 0,
            ..CachePolicy::default()
        };
        assert!(matches!(zero_ttl.validate(), Err(EngineError::Config(_))));

        let zero_timeout = CachePolicy {
            backend_timeout_ms: 0,
            ..CachePolicy::default()
        };
        assert!(matches!(zero_timeout.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_portfolio_ttl_bounded_by_refresh() {
        let policy = CachePolicy {
            portfolio_ttl_secs: 60,
            curve_refresh_secs: 600,
            ..CachePolicy::default()
        };
        assert_eq!(policy.ttl_for(TtlClass::PortfolioDerived), Duration::from_secs(60));
    }
}
