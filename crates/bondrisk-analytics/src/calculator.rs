//! Integrated risk calculator.
//!
//! [`RiskCalculator`] wires every calculator from one [`AnalyticsConfig`] and
//! exposes the three portfolio-level computations the engine serves:
//! valuation, risk and stress.

use chrono::{DateTime, Utc};

use bondrisk_core::{Portfolio, RiskError, RiskResult, ShockDirection, StressResult, YieldCurve};

use crate::aggregate::{PortfolioAggregator, PortfolioValuation};
use crate::config::AnalyticsConfig;
use crate::sensitivity::{Sensitivities, SensitivityCalculator};
use crate::stress::StressEngine;
use crate::valuation::BondValuator;
use crate::var::VaRCalculator;

/// Portfolio valuation, risk and stress in one place.
#[derive(Debug, Clone, Copy)]
pub struct RiskCalculator {
    aggregator: PortfolioAggregator,
    var: VaRCalculator,
    stress: StressEngine,
}

impl RiskCalculator {
    /// Build all calculators from `config`.
    pub fn new(config: &AnalyticsConfig) -> Result<Self, RiskError> {
        let valuator = BondValuator::new(config.face_value, config.coupon_frequency)?;
        let sensitivity = SensitivityCalculator::new(config.bump_bps)?;
        let aggregator = PortfolioAggregator::new(valuator, sensitivity, config.parallel_threshold);
        let var = VaRCalculator::new(config.daily_yield_vol, config.var_horizon_days)?;

        Ok(Self {
            aggregator,
            var,
            stress: StressEngine::new(aggregator),
        })
    }

    /// The portfolio aggregator.
    pub fn aggregator(&self) -> &PortfolioAggregator {
        &self.aggregator
    }

    /// Portfolio totals and per-position breakdown.
    pub fn valuation(
        &self,
        portfolio: &Portfolio,
        curve: &YieldCurve,
    ) -> Result<PortfolioValuation, RiskError> {
        self.aggregator.aggregate(portfolio, curve)
    }

    /// Portfolio-level sensitivities from bumping the whole portfolio value.
    pub fn exposure(&self, portfolio: &Portfolio, curve: &YieldCurve) -> Result<Sensitivities, RiskError> {
        self.aggregator
            .sensitivity()
            .measure(curve, |c| self.aggregator.portfolio_value(portfolio, c))
    }

    /// VaR, duration, convexity and DV01 of a portfolio.
    ///
    /// Fails with [`RiskError::InsufficientData`] for an empty portfolio.
    pub fn risk(
        &self,
        portfolio: &Portfolio,
        curve: &YieldCurve,
        calculated_at: DateTime<Utc>,
    ) -> Result<RiskResult, RiskError> {
        if portfolio.is_empty() {
            return Err(RiskError::insufficient_data(format!(
                "portfolio {} holds no bonds",
                portfolio.id
            )));
        }

        let exposure = self.exposure(portfolio, curve)?;
        let var = self.var.calculate(portfolio, &exposure)?;

        Ok(RiskResult {
            var_95: var.var_95,
            var_99: var.var_99,
            duration: exposure.duration,
            convexity: exposure.convexity,
            dv01: exposure.dv01,
            calculated_at,
        })
    }

    /// Stress P&L under a parallel shock.
    pub fn stress(
        &self,
        portfolio: &Portfolio,
        curve: &YieldCurve,
        shock_bps: i32,
        direction: ShockDirection,
        calculated_at: DateTime<Utc>,
    ) -> Result<StressResult, RiskError> {
        self.stress
            .run(portfolio, curve, shock_bps, direction, calculated_at)
    }
}

impl Default for RiskCalculator {
    fn default() -> Self {
        let aggregator = PortfolioAggregator::default();
        Self {
            aggregator,
            var: VaRCalculator::default(),
            stress: StressEngine::new(aggregator),
        }
    }
}
