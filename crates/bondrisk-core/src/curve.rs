//! Yield curve representation.
//!
//! A [`YieldCurve`] is an ordered sequence of `(tenor, yield)` points with
//! tenors in years and yields as decimal annual rates. Between points the
//! curve is linear; beyond either end it is flat.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::RiskError;

/// A single curve pillar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Tenor in years.
    pub tenor: f64,
    /// Annually compounded yield as a decimal.
    pub rate: f64,
}

impl CurvePoint {
    /// Create a new curve point.
    pub const fn new(tenor: f64, rate: f64) -> Self {
        Self { tenor, rate }
    }
}

/// A named yield curve as of a given date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldCurve {
    name: String,
    as_of: NaiveDate,
    points: Vec<CurvePoint>,
}

impl YieldCurve {
    /// Build a curve, checking that tenors are finite and strictly increasing.
    pub fn new(
        name: impl Into<String>,
        as_of: NaiveDate,
        points: Vec<CurvePoint>,
    ) -> Result<Self, RiskError> {
        check_points(&points)?;
        Ok(Self {
            name: name.into(),
            as_of,
            points,
        })
    }

    /// Curve name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// As-of (valuation) date.
    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Curve pillars in tenor order.
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Number of pillars.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the curve has no pillars.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Check the curve can be used for discounting.
    ///
    /// Curves arriving through deserialization bypass [`YieldCurve::new`], so
    /// the ordering invariant is re-checked here as well.
    pub fn ensure_usable(&self) -> Result<(), RiskError> {
        if self.points.len() < 2 {
            return Err(RiskError::invalid_curve(format!(
                "curve '{}' has {} point(s), at least 2 required",
                self.name,
                self.points.len()
            )));
        }
        check_points(&self.points)
    }

    /// Yield at `tenor` years: linear between pillars, flat outside them.
    ///
    /// Returns `None` for an empty curve.
    pub fn rate_at(&self, tenor: f64) -> Option<f64> {
        let first = self.points.first()?;
        let last = self.points.last()?;

        if tenor <= first.tenor {
            return Some(first.rate);
        }
        if tenor >= last.tenor {
            return Some(last.rate);
        }

        // First pillar strictly beyond the tenor; the previous one brackets it.
        let idx = self.points.partition_point(|p| p.tenor <= tenor);
        let lo = self.points[idx - 1];
        let hi = self.points[idx];
        let w = (tenor - lo.tenor) / (hi.tenor - lo.tenor);
        Some(lo.rate + w * (hi.rate - lo.rate))
    }

    /// A new curve with every yield moved by `delta` (decimal, signed).
    pub fn shifted(&self, delta: f64) -> YieldCurve {
        YieldCurve {
            name: self.name.clone(),
            as_of: self.as_of,
            points: self
                .points
                .iter()
                .map(|p| CurvePoint::new(p.tenor, p.rate + delta))
                .collect(),
        }
    }
}

fn check_points(points: &[CurvePoint]) -> Result<(), RiskError> {
    for p in points {
        if !p.tenor.is_finite() || !p.rate.is_finite() {
            return Err(RiskError::invalid_curve(format!(
                "non-finite pillar ({}, {})",
                p.tenor, p.rate
            )));
        }
        if p.tenor < 0.0 {
            return Err(RiskError::invalid_curve(format!(
                "negative tenor {}",
                p.tenor
            )));
        }
    }
    if let Some(w) = points.windows(2).find(|w| w[1].tenor <= w[0].tenor) {
        return Err(RiskError::invalid_curve(format!(
            "tenors must be strictly increasing, found {} then {}",
            w[0].tenor, w[1].tenor
        )));
    }
    Ok(())
}
