//! Curve shock stress testing.
//!
//! Full revaluation on the shocked curve, no duration/convexity
//! approximation:
//!
//! ```text
//! PnL  = V(shocked) - V(base)
//! PnL% = PnL / V(base)        (0 when V(base) = 0)
//! ```

use chrono::{DateTime, Utc};

use bondrisk_core::{Portfolio, RiskError, ShockDirection, StressResult, YieldCurve};

use crate::aggregate::PortfolioAggregator;
use crate::curve_provider::YieldCurveProvider;
use crate::VALUE_EPSILON;

/// Revalues a portfolio under a parallel curve shock.
#[derive(Debug, Clone, Copy)]
pub struct StressEngine {
    aggregator: PortfolioAggregator,
}

impl StressEngine {
    /// Create a stress engine.
    pub fn new(aggregator: PortfolioAggregator) -> Self {
        Self { aggregator }
    }

    /// Apply a `shock_bps` shock in `direction` and report the P&L.
    ///
    /// The shock is validated before any valuation runs. `portfolio` and
    /// `curve` are only read.
    pub fn run(
        &self,
        portfolio: &Portfolio,
        curve: &YieldCurve,
        shock_bps: i32,
        direction: ShockDirection,
        calculated_at: DateTime<Utc>,
    ) -> Result<StressResult, RiskError> {
        let shocked = YieldCurveProvider::shock(curve, shock_bps, direction)?;

        let original_value = self.aggregator.portfolio_value(portfolio, curve)?;
        let stressed_value = self.aggregator.portfolio_value(portfolio, &shocked)?;
        let pnl = stressed_value - original_value;
        let pnl_percent = if original_value.abs() < VALUE_EPSILON {
            0.0
        } else {
            pnl / original_value
        };

        Ok(StressResult {
            shock_bps,
            direction,
            original_value,
            stressed_value,
            pnl,
            pnl_percent,
            calculated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bondrisk_core::{Bond, BondId, CurvePoint, PortfolioId, UserId};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn curve() -> YieldCurve {
        YieldCurve::new(
            "USD",
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            vec![
                CurvePoint::new(1.0, 0.02),
                CurvePoint::new(5.0, 0.03),
                CurvePoint::new(10.0, 0.04),
            ],
        )
        .unwrap()
    }

    fn portfolio() -> Portfolio {
        let mut p = Portfolio::new(PortfolioId::new(1), "Default", UserId::new(1));
        p.insert_bond(Bond {
            id: BondId::new(1),
            name: "5Y".to_string(),
            coupon: dec!(0.03),
            maturity: NaiveDate::from_ymd_opt(2030, 1, 15).unwrap(),
            price: dec!(100),
            quantity: 100,
        });
        p
    }

    #[test]
    fn test_up_shock_loses_value() {
        let engine = StressEngine::new(PortfolioAggregator::default());
        let r = engine
            .run(&portfolio(), &curve(), 100, ShockDirection::Up, Utc::now())
            .unwrap();
        assert!(r.stressed_value < r.original_value);
        assert!(r.pnl < 0.0);
        assert!(r.pnl_percent < 0.0);
        assert!(r.is_loss());
    }

    #[test]
    fn test_down_shock_gains_value() {
        let engine = StressEngine::new(PortfolioAggregator::default());
        let r = engine
            .run(&portfolio(), &curve(), 50, ShockDirection::Down, Utc::now())
            .unwrap();
        assert!(r.pnl > 0.0);
    }

    #[test]
    fn test_zero_shock_has_zero_pnl() {
        let engine = StressEngine::new(PortfolioAggregator::default());
        let r = engine
            .run(&portfolio(), &curve(), 0, ShockDirection::Up, Utc::now())
            .unwrap();
        assert_eq!(r.pnl, 0.0);
        assert_eq!(r.pnl_percent, 0.0);
    }

    #[test]
    fn test_empty_portfolio_reports_zero_percent() {
        let engine = StressEngine::new(PortfolioAggregator::default());
        let empty = Portfolio::new(PortfolioId::new(2), "Empty", UserId::new(1));
        let r = engine
            .run(&empty, &curve(), 200, ShockDirection::Up, Utc::now())
            .unwrap();
        assert_eq!(r.original_value, 0.0);
        assert_eq!(r.pnl_percent, 0.0);
    }

    #[test]
    fn test_negative_shock_rejected() {
        let engine = StressEngine::new(PortfolioAggregator::default());
        let result = engine.run(&portfolio(), &curve(), -1, ShockDirection::Up, Utc::now());
        assert!(matches!(result, Err(RiskError::InvalidArgument(_))));
    }
}
