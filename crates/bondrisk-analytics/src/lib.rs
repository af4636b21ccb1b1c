//! # bondrisk-analytics
//!
//! Pure risk analytics for fixed-coupon bond portfolios.
//!
//! - [`BondValuator`]: cash-flow schedule and curve discounting
//! - [`SensitivityCalculator`]: duration, convexity and DV01 by curve bumping
//! - [`YieldCurveProvider`]: the live curve snapshot and curve shocks
//! - [`PortfolioAggregator`]: position valuation and market-value weighting
//! - [`VaRCalculator`]: parametric (duration-normal) Value-at-Risk
//! - [`StressEngine`]: shocked revaluation and P&L
//! - [`RiskCalculator`]: all of the above wired from one [`AnalyticsConfig`]
//!
//! Every calculator is immutable after construction and `Send + Sync`; all
//! operations are pure functions of their inputs. Callers are expected to
//! take one curve snapshot per computation and pass it down.
//!
//! ## Example
//!
//! ```ignore
//! use bondrisk_analytics::{AnalyticsConfig, RiskCalculator};
//!
//! let calc = RiskCalculator::new(&AnalyticsConfig::default())?;
//! let curve = provider.current();
//! let risk = calc.risk(&portfolio, &curve, Utc::now())?;
//! println!("VaR99: {:.2}", risk.var_99);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod calculator;
pub mod config;
pub mod curve_provider;
pub mod sensitivity;
pub mod stress;
pub mod valuation;
pub mod var;

pub use aggregate::{PortfolioAggregator, PortfolioValuation, PositionValuation};
pub use calculator::RiskCalculator;
pub use config::AnalyticsConfig;
pub use curve_provider::YieldCurveProvider;
pub use sensitivity::{Sensitivities, SensitivityCalculator};
pub use stress::StressEngine;
pub use valuation::{BondValuator, CashFlow};
pub use var::{VaRCalculator, VaRFigures};

/// Values with magnitude below this are treated as zero in denominators.
pub(crate) const VALUE_EPSILON: f64 = 1e-12;
