//! Portfolio aggregation.
//!
//! Position value = bond PV × quantity. Average yield and average duration are
//! weighted by position market value so that a large quantity of a cheap bond
//! does not dominate.
//!
//! Nothing is stored between calls: every aggregate is recomputed from the
//! portfolio's bond set and the supplied curve.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use bondrisk_core::{Bond, BondId, Portfolio, RiskError, YieldCurve};

use crate::sensitivity::SensitivityCalculator;
use crate::valuation::BondValuator;
use crate::VALUE_EPSILON;

/// Valuation of a single position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionValuation {
    /// Bond identifier.
    pub bond_id: BondId,
    /// Model value of one bond.
    pub unit_value: f64,
    /// `unit_value × quantity`.
    pub market_value: f64,
    /// Yield to maturity implied by the model value.
    pub yield_to_maturity: f64,
    /// Modified duration.
    pub duration: f64,
    /// Convexity.
    pub convexity: f64,
    /// Position DV01.
    pub dv01: f64,
}

/// Portfolio-level totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioValuation {
    /// Sum of position market values.
    pub total_value: f64,
    /// Market-value-weighted yield to maturity.
    pub average_yield: f64,
    /// Market-value-weighted modified duration.
    pub average_duration: f64,
    /// Sum of position DV01s.
    pub total_dv01: f64,
    /// Per-position breakdown in portfolio order.
    pub positions: Vec<PositionValuation>,
}

/// Rolls bond valuations up to portfolio totals.
#[derive(Debug, Clone, Copy)]
pub struct PortfolioAggregator {
    valuator: BondValuator,
    sensitivity: SensitivityCalculator,
    parallel_threshold: usize,
}

impl PortfolioAggregator {
    /// Create an aggregator.
    pub fn new(
        valuator: BondValuator,
        sensitivity: SensitivityCalculator,
        parallel_threshold: usize,
    ) -> Self {
        Self {
            valuator,
            sensitivity,
            parallel_threshold,
        }
    }

    /// The bond valuator.
    pub fn valuator(&self) -> &BondValuator {
        &self.valuator
    }

    /// The sensitivity calculator.
    pub fn sensitivity(&self) -> &SensitivityCalculator {
        &self.sensitivity
    }

    /// Full valuation with sensitivities. An empty portfolio values to zero.
    pub fn aggregate(
        &self,
        portfolio: &Portfolio,
        curve: &YieldCurve,
    ) -> Result<PortfolioValuation, RiskError> {
        curve.ensure_usable()?;

        let positions = self.map_bonds(&portfolio.bonds, |bond| self.value_position(bond, curve))?;

        let total_value: f64 = positions.iter().map(|p| p.market_value).sum();
        let total_dv01: f64 = positions.iter().map(|p| p.dv01).sum();

        let (average_yield, average_duration) = if total_value.abs() < VALUE_EPSILON {
            (0.0, 0.0)
        } else {
            let weighted_yield: f64 = positions
                .iter()
                .map(|p| p.market_value * p.yield_to_maturity)
                .sum();
            let weighted_duration: f64 =
                positions.iter().map(|p| p.market_value * p.duration).sum();
            (weighted_yield / total_value, weighted_duration / total_value)
        };

        Ok(PortfolioValuation {
            total_value,
            average_yield,
            average_duration,
            total_dv01,
            positions,
        })
    }

    /// Total portfolio value only; used for bumped and shocked revaluation.
    pub fn portfolio_value(&self, portfolio: &Portfolio, curve: &YieldCurve) -> Result<f64, RiskError> {
        curve.ensure_usable()?;

        let values = self.map_bonds(&portfolio.bonds, |bond| {
            Ok(self.valuator.present_value(bond, curve)? * bond.quantity_f64())
        })?;
        Ok(values.iter().sum())
    }

    fn value_position(&self, bond: &Bond, curve: &YieldCurve) -> Result<PositionValuation, RiskError> {
        let s = self.sensitivity.bond(&self.valuator, bond, curve)?;
        let yield_to_maturity = self.valuator.yield_to_maturity(bond, curve)?;
        let quantity = bond.quantity_f64();

        Ok(PositionValuation {
            bond_id: bond.id,
            unit_value: s.present_value,
            market_value: s.present_value * quantity,
            yield_to_maturity,
            duration: s.duration,
            convexity: s.convexity,
            dv01: s.dv01 * quantity,
        })
    }

    /// Map over bonds, in parallel above the threshold.
    ///
    /// Results always come back in bond order so that sums downstream are
    /// bit-identical whichever path ran.
    fn map_bonds<T, F>(&self, bonds: &[Bond], f: F) -> Result<Vec<T>, RiskError>
    where
        T: Send,
        F: Fn(&Bond) -> Result<T, RiskError> + Sync + Send,
    {
        if bonds.len() >= self.parallel_threshold {
            bonds.par_iter().map(&f).collect()
        } else {
            bonds.iter().map(&f).collect()
        }
    }
}

impl Default for PortfolioAggregator {
    fn default() -> Self {
        Self::new(BondValuator::default(), SensitivityCalculator::default(), 64)
    }
}
