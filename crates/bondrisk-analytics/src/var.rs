//! Parametric Value-at-Risk.
//!
//! ## Formula
//!
//! ```text
//! VaR_p = z_p × D × V × σ_daily × √h
//! ```
//!
//! ## Assumptions
//!
//! This is the duration-normal approximation. It assumes daily parallel
//! yield changes are normally distributed with a constant standard deviation
//! `σ_daily`, ignores convexity, and scales to an `h`-day horizon by √h. It is
//! a modelling simplification, not a statement about realised losses.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use bondrisk_core::{Portfolio, RiskError};

use crate::sensitivity::Sensitivities;
use crate::VALUE_EPSILON;

/// VaR at the two reported confidence levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VaRFigures {
    /// 95% one-tailed VaR.
    pub var_95: f64,
    /// 99% one-tailed VaR.
    pub var_99: f64,
}

/// Duration-normal VaR calculator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VaRCalculator {
    daily_yield_vol: f64,
    horizon_days: u32,
    z_95: f64,
    z_99: f64,
}

impl VaRCalculator {
    /// Create a calculator.
    pub fn new(daily_yield_vol: f64, horizon_days: u32) -> Result<Self, RiskError> {
        if !daily_yield_vol.is_finite() || daily_yield_vol < 0.0 {
            return Err(RiskError::invalid_argument(format!(
                "daily yield volatility must be non-negative, got {daily_yield_vol}"
            )));
        }
        if horizon_days == 0 {
            return Err(RiskError::invalid_argument("VaR horizon must be at least one day"));
        }
        Ok(Self {
            daily_yield_vol,
            horizon_days,
            z_95: z_score(0.95)?,
            z_99: z_score(0.99)?,
        })
    }

    /// Assumed daily yield volatility.
    pub fn daily_yield_vol(&self) -> f64 {
        self.daily_yield_vol
    }

    /// VaR of `value` with modified duration `duration` at `confidence`.
    pub fn value_at_risk(&self, value: f64, duration: f64, confidence: f64) -> Result<f64, RiskError> {
        Ok(self.scaled(z_score(confidence)?, value, duration))
    }

    /// 95% and 99% VaR for a portfolio with the given aggregate exposure.
    ///
    /// Fails with [`RiskError::InsufficientData`] for an empty portfolio or
    /// one with no value.
    pub fn calculate(
        &self,
        portfolio: &Portfolio,
        exposure: &Sensitivities,
    ) -> Result<VaRFigures, RiskError> {
        if portfolio.is_empty() {
            return Err(RiskError::insufficient_data(format!(
                "portfolio {} holds no bonds",
                portfolio.id
            )));
        }
        if exposure.present_value.abs() < VALUE_EPSILON {
            return Err(RiskError::insufficient_data(format!(
                "portfolio {} has no value",
                portfolio.id
            )));
        }

        Ok(VaRFigures {
            var_95: self.scaled(self.z_95, exposure.present_value, exposure.duration),
            var_99: self.scaled(self.z_99, exposure.present_value, exposure.duration),
        })
    }

    fn scaled(&self, z: f64, value: f64, duration: f64) -> f64 {
        z * duration.abs()
            * value.abs()
            * self.daily_yield_vol
            * f64::from(self.horizon_days).sqrt()
    }
}

impl Default for VaRCalculator {
    fn default() -> Self {
        Self {
            daily_yield_vol: 0.0010,
            horizon_days: 1,
            z_95: 1.6448536269514722,
            z_99: 2.3263478740408408,
        }
    }
}

/// One-tailed standard normal quantile for `confidence` in (0.5, 1).
pub fn z_score(confidence: f64) -> Result<f64, RiskError> {
    if !(confidence > 0.5 && confidence < 1.0) {
        return Err(RiskError::invalid_argument(format!(
            "confidence must be in (0.5, 1), got {confidence}"
        )));
    }
    let normal = Normal::new(0.0, 1.0).map_err(|e| RiskError::computation(e.to_string()))?;
    Ok(normal.inverse_cdf(confidence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bondrisk_core::{BondId, PortfolioId, UserId};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn non_empty() -> Portfolio {
        let mut p = Portfolio::new(PortfolioId::new(3), "Default", UserId::new(1));
        p.insert_bond(bondrisk_core::Bond {
            id: BondId::new(1),
            name: "B".to_string(),
            coupon: dec!(0.03),
            maturity: NaiveDate::from_ymd_opt(2030, 1, 15).unwrap(),
            price: dec!(100),
            quantity: 1,
        });
        p
    }

    #[test]
    fn test_z_scores() {
        assert_relative_eq!(z_score(0.95).unwrap(), 1.645, epsilon = 1e-3);
        assert_relative_eq!(z_score(0.99).unwrap(), 2.326, epsilon = 1e-3);
        assert!(z_score(0.4).is_err());
        assert!(z_score(1.0).is_err());
    }

    #[test]
    fn test_default_matches_constructed() {
        let built = VaRCalculator::new(0.0010, 1).unwrap();
        let default = VaRCalculator::default();
        assert_relative_eq!(built.z_95, default.z_95, epsilon = 1e-9);
        assert_relative_eq!(built.z_99, default.z_99, epsilon = 1e-9);
    }

    #[test]
    fn test_parametric_var() {
        let calc = VaRCalculator::new(0.0010, 1).unwrap();
        let exposure = Sensitivities {
            present_value: 1_000_000.0,
            duration: 5.0,
            convexity: 30.0,
            dv01: 500.0,
        };
        let var = calc.calculate(&non_empty(), &exposure).unwrap();

        // 1.645 × 5 × 1,000,000 × 0.001 ≈ 8,224
        assert_relative_eq!(var.var_95, 8224.27, epsilon = 0.1);
        assert!(var.var_99 > var.var_95);
    }

    #[test]
    fn test_horizon_scaling() {
        let one = VaRCalculator::new(0.001, 1).unwrap();
        let ten = VaRCalculator::new(0.001, 10).unwrap();
        let a = one.value_at_risk(1e6, 4.0, 0.99).unwrap();
        let b = ten.value_at_risk(1e6, 4.0, 0.99).unwrap();
        assert_relative_eq!(b / a, 10f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_empty_portfolio_is_insufficient_data() {
        let empty = Portfolio::new(PortfolioId::new(4), "Empty", UserId::new(1));
        let result = VaRCalculator::default().calculate(&empty, &Sensitivities::default());
        assert!(matches!(result, Err(RiskError::InsufficientData(_))));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(VaRCalculator::new(-0.01, 1).is_err());
        assert!(VaRCalculator::new(0.01, 0).is_err());
    }
}
