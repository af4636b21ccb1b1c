//! Analytics parameters.

use serde::{Deserialize, Serialize};

/// Tunable parameters for every calculator.
///
/// The defaults are modelling assumptions, not market facts:
///
/// | field | default | meaning |
/// |---|---|---|
/// | `bump_bps` | 1.0 | finite-difference bump Δ |
/// | `face_value` | 100 | face per bond; prices are per 100 |
/// | `coupon_frequency` | 1 | coupons per year |
/// | `daily_yield_vol` | 0.0010 | σ of daily yield changes (10bp) |
/// | `var_horizon_days` | 1 | VaR horizon, scaled by √days |
/// | `parallel_threshold` | 64 | bond count above which positions value in parallel |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Finite-difference bump in basis points.
    pub bump_bps: f64,
    /// Face value per bond.
    pub face_value: f64,
    /// Coupon payments per year. Must divide 12.
    pub coupon_frequency: u32,
    /// Assumed standard deviation of daily yield changes (decimal).
    pub daily_yield_vol: f64,
    /// VaR horizon in trading days.
    pub var_horizon_days: u32,
    /// Minimum bond count for parallel position valuation.
    pub parallel_threshold: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            bump_bps: 1.0,
            face_value: 100.0,
            coupon_frequency: 1,
            daily_yield_vol: 0.0010,
            var_horizon_days: 1,
            parallel_threshold: 64,
        }
    }
}
