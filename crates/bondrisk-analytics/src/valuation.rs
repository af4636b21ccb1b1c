//! Bond valuation against a yield curve.
//!
//! ## Formula
//!
//! ```text
//! PV = Σ CFᵢ / (1 + r(tᵢ))^tᵢ
//! ```
//!
//! where `tᵢ` is the ACT/365F year fraction from the curve's as-of date to the
//! cash-flow date and `r(t)` is the linearly interpolated curve yield (flat
//! beyond the curve's ends).

use chrono::{Months, NaiveDate};

use bondrisk_core::{Bond, RiskError, YieldCurve};

const DAYS_PER_YEAR: f64 = 365.0;
const YIELD_TOLERANCE: f64 = 1e-12;
const MAX_NEWTON_ITERATIONS: usize = 50;
const MAX_BISECTION_ITERATIONS: usize = 200;
const YIELD_LOWER_BOUND: f64 = -0.99;
const YIELD_UPPER_BOUND: f64 = 1.0;

/// A single scheduled payment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CashFlow {
    /// Payment date.
    pub date: NaiveDate,
    /// Years from the valuation date (ACT/365F).
    pub tenor: f64,
    /// Amount paid per bond.
    pub amount: f64,
}

/// Prices fixed-coupon bonds off a [`YieldCurve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondValuator {
    face_value: f64,
    coupon_frequency: u32,
}

impl BondValuator {
    /// Create a valuator.
    ///
    /// `coupon_frequency` must be 1, 2, 3, 4, 6 or 12.
    pub fn new(face_value: f64, coupon_frequency: u32) -> Result<Self, RiskError> {
        if !face_value.is_finite() || face_value <= 0.0 {
            return Err(RiskError::invalid_argument(format!(
                "face value must be positive, got {face_value}"
            )));
        }
        if coupon_frequency == 0 || 12 % coupon_frequency != 0 {
            return Err(RiskError::invalid_argument(format!(
                "coupon frequency must divide 12, got {coupon_frequency}"
            )));
        }
        Ok(Self {
            face_value,
            coupon_frequency,
        })
    }

    /// Face value per bond.
    pub fn face_value(&self) -> f64 {
        self.face_value
    }

    /// Future cash flows of `bond` as seen from `valuation_date`.
    ///
    /// Coupon dates are rolled back from maturity in whole periods, so the
    /// schedule never drifts across month ends. Flows on or before the
    /// valuation date are excluded; a matured bond has none.
    pub fn cash_flows(&self, bond: &Bond, valuation_date: NaiveDate) -> Vec<CashFlow> {
        if bond.maturity <= valuation_date {
            return Vec::new();
        }

        let months_per_period = 12 / self.coupon_frequency;
        let coupon = self.face_value * bond.coupon_rate() / f64::from(self.coupon_frequency);

        let mut dates = Vec::new();
        let mut period = 0u32;
        while let Some(date) = bond
            .maturity
            .checked_sub_months(Months::new(months_per_period * period))
        {
            if date <= valuation_date {
                break;
            }
            dates.push(date);
            period += 1;
        }
        dates.reverse();

        let last = dates.len().saturating_sub(1);
        dates
            .into_iter()
            .enumerate()
            .map(|(i, date)| CashFlow {
                date,
                tenor: year_fraction(valuation_date, date),
                amount: if i == last {
                    coupon + self.face_value
                } else {
                    coupon
                },
            })
            .collect()
    }

    /// Present value of one bond, discounted on `curve` as of its as-of date.
    pub fn present_value(&self, bond: &Bond, curve: &YieldCurve) -> Result<f64, RiskError> {
        curve.ensure_usable()?;

        self.cash_flows(bond, curve.as_of())
            .iter()
            .try_fold(0.0, |pv, cf| {
                let rate = curve
                    .rate_at(cf.tenor)
                    .ok_or_else(|| RiskError::invalid_curve("curve has no points"))?;
                Ok(pv + cf.amount * discount_factor(rate, cf.tenor)?)
            })
    }

    /// Flat annually-compounded yield that reproduces the model PV.
    ///
    /// Newton-Raphson from the curve yield at maturity, falling back to
    /// bisection on `[-99%, 100%]`. A bond without future cash flows has a
    /// yield of zero.
    pub fn yield_to_maturity(&self, bond: &Bond, curve: &YieldCurve) -> Result<f64, RiskError> {
        let target = self.present_value(bond, curve)?;
        let flows = self.cash_flows(bond, curve.as_of());
        let Some(final_flow) = flows.last() else {
            return Ok(0.0);
        };

        let price_at = |y: f64| -> f64 {
            flows
                .iter()
                .map(|cf| cf.amount * (1.0 + y).powf(-cf.tenor))
                .sum::<f64>()
        };

        let mut y = curve.rate_at(final_flow.tenor).unwrap_or(0.0);
        for _ in 0..MAX_NEWTON_ITERATIONS {
            if y <= YIELD_LOWER_BOUND {
                break;
            }
            let f = price_at(y) - target;
            if f.abs() < YIELD_TOLERANCE {
                return Ok(y);
            }
            let slope: f64 = flows
                .iter()
                .map(|cf| -cf.tenor * cf.amount * (1.0 + y).powf(-cf.tenor - 1.0))
                .sum();
            if slope.abs() < f64::EPSILON {
                break;
            }
            y -= f / slope;
        }

        // Price is decreasing in yield for positive flows.
        let (mut lo, mut hi) = (YIELD_LOWER_BOUND, YIELD_UPPER_BOUND);
        if (price_at(lo) - target) * (price_at(hi) - target) > 0.0 {
            return Err(RiskError::computation(format!(
                "yield for bond {} not bracketed by [{lo}, {hi}]",
                bond.id
            )));
        }
        for _ in 0..MAX_BISECTION_ITERATIONS {
            let mid = 0.5 * (lo + hi);
            if price_at(mid) > target {
                lo = mid;
            } else {
                hi = mid;
            }
            if hi - lo < YIELD_TOLERANCE {
                break;
            }
        }
        Ok(0.5 * (lo + hi))
    }
}

impl Default for BondValuator {
    fn default() -> Self {
        Self {
            face_value: 100.0,
            coupon_frequency: 1,
        }
    }
}

/// ACT/365F year fraction.
pub fn year_fraction(start: NaiveDate, end: NaiveDate) -> f64 {
    (end - start).num_days() as f64 / DAYS_PER_YEAR
}

fn discount_factor(rate: f64, tenor: f64) -> Result<f64, RiskError> {
    let base = 1.0 + rate;
    if base <= 0.0 {
        return Err(RiskError::computation(format!(
            "discount base 1 + {rate} is not positive"
        )));
    }
    Ok(base.powf(-tenor))
}
