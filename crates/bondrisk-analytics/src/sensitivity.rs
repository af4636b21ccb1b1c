//! Curve-bump sensitivities.
//!
//! ## Formulas
//!
//! ```text
//! D   = -(P₊ - P₋) / (2 × P₀ × Δ)
//! C   =  (P₊ - 2P₀ + P₋) / (P₀ × Δ²)
//! DV01 = (P₀ - P₊) × (1bp / Δ)
//! ```
//!
//! where `P₊`/`P₋` are values on the curve shifted up/down by Δ. With the
//! default Δ = 1bp the DV01 is exactly `P₀ - P(+1bp)`.

use bondrisk_core::{Bond, RiskError, YieldCurve, ONE_BP};

use crate::valuation::BondValuator;
use crate::VALUE_EPSILON;

/// Sensitivities of a value to parallel curve moves.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sensitivities {
    /// Value on the unshifted curve.
    pub present_value: f64,
    /// Modified duration in years.
    pub duration: f64,
    /// Convexity.
    pub convexity: f64,
    /// Value lost for a 1bp rise.
    pub dv01: f64,
}

/// Finite-difference sensitivity calculator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensitivityCalculator {
    bump_bps: f64,
}

impl SensitivityCalculator {
    /// Create a calculator with a bump of `bump_bps` basis points.
    ///
    /// A zero bump is accepted and yields zero sensitivities.
    pub fn new(bump_bps: f64) -> Result<Self, RiskError> {
        if !bump_bps.is_finite() || bump_bps < 0.0 {
            return Err(RiskError::invalid_argument(format!(
                "bump must be a non-negative number of bps, got {bump_bps}"
            )));
        }
        Ok(Self { bump_bps })
    }

    /// Bump size in basis points.
    pub fn bump_bps(&self) -> f64 {
        self.bump_bps
    }

    /// Sensitivities of an arbitrary curve-dependent value.
    ///
    /// `value` is evaluated on the base curve and, when the bump and base
    /// value are non-zero, on the curve shifted up and down by Δ.
    pub fn measure<F>(&self, curve: &YieldCurve, value: F) -> Result<Sensitivities, RiskError>
    where
        F: Fn(&YieldCurve) -> Result<f64, RiskError>,
    {
        let base = value(curve)?;
        if self.bump_bps == 0.0 || base.abs() < VALUE_EPSILON {
            return Ok(Sensitivities {
                present_value: base,
                ..Sensitivities::default()
            });
        }

        let delta = self.bump_bps * ONE_BP;
        let up = value(&curve.shifted(delta))?;
        let down = value(&curve.shifted(-delta))?;

        Ok(Sensitivities {
            present_value: base,
            duration: -(up - down) / (2.0 * base * delta),
            convexity: (up - 2.0 * base + down) / (base * delta * delta),
            dv01: (base - up) * (ONE_BP / delta),
        })
    }

    /// Sensitivities of a single bond (per bond, not per position).
    pub fn bond(
        &self,
        valuator: &BondValuator,
        bond: &Bond,
        curve: &YieldCurve,
    ) -> Result<Sensitivities, RiskError> {
        self.measure(curve, |c| valuator.present_value(bond, c))
    }
}

impl Default for SensitivityCalculator {
    fn default() -> Self {
        Self { bump_bps: 1.0 }
    }
}
