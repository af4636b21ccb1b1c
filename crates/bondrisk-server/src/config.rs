//! Server configuration.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bondrisk_core::{CurvePoint, RiskError, YieldCurve};
use bondrisk_engine::EngineConfig;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`ServerConfig`]
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Redb database path. In-memory stores when unset.
    pub storage_path: Option<String>,

    /// CSV curve file (`tenor_years,yield`), polled by the refresh loop
    pub curve_file: Option<String>,

    /// Name of the live curve
    #[serde(default = "default_curve_name")]
    pub curve_name: String,

    /// Curve used at startup when no curve file is configured
    #[serde(default = "default_curve_points")]
    pub curve_points: Vec<CurvePoint>,

    /// Origins allowed by CORS. Any origin when empty.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Engine configuration
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_curve_name() -> String {
    "USD".to_string()
}

fn default_curve_points() -> Vec<CurvePoint> {
    vec![
        CurvePoint::new(0.25, 0.0430),
        CurvePoint::new(1.0, 0.0415),
        CurvePoint::new(2.0, 0.0400),
        CurvePoint::new(5.0, 0.0390),
        CurvePoint::new(10.0, 0.0405),
        CurvePoint::new(30.0, 0.0430),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            storage_path: None,
            curve_file: None,
            curve_name: default_curve_name(),
            curve_points: default_curve_points(),
            cors_origins: Vec::new(),
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// The configured startup curve.
    pub fn initial_curve(&self, as_of: NaiveDate) -> Result<YieldCurve, RiskError> {
        let curve = YieldCurve::new(self.curve_name.clone(), as_of, self.curve_points.clone())?;
        curve.ensure_usable()?;
        Ok(curve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.storage_path.is_none());
        assert_eq!(config.engine, EngineConfig::default());
        assert!(config
            .initial_curve(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap())
            .is_ok());
    }

    #[test]
    fn test_engine_table() {
        let config = ServerConfig::from_toml(
            r#"
            port = 9090
            storage_path = "./data/bondrisk.redb"

            [engine.analytics]
            daily_yield_vol = 0.0015

            [engine.cache]
            market_data_ttl_secs = 60
            backend_timeout_ms = 100
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.storage_path.as_deref(), Some("./data/bondrisk.redb"));
        assert_eq!(config.engine.analytics.daily_yield_vol, 0.0015);
        assert_eq!(config.engine.analytics.bump_bps, 1.0);
        assert_eq!(config.engine.cache.market_data_ttl_secs, 60);
        assert_eq!(config.engine.cache.identity_ttl_secs, 3600);
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_zero_refresh_parses_but_fails_validation() {
        let config = ServerConfig::from_toml("[engine.cache]\ncurve_refresh_secs = 0").unwrap();
        assert_eq!(config.engine.cache.curve_refresh_secs, 0);
        assert!(config.engine.cache.validate().is_err());
    }

    #[test]
    fn test_bad_curve_points() {
        let config = ServerConfig::from_toml(
            r#"
            curve_points = [{ tenor = 5.0, rate = 0.03 }, { tenor = 1.0, rate = 0.02 }]
            "#,
        )
        .unwrap();
        assert!(config
            .initial_curve(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap())
            .is_err());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            ServerConfig::from_toml("port = \"eighty\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
