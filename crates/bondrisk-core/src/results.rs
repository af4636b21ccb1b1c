//! Risk and stress result snapshots.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RiskError;

/// Direction of a yield curve shock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShockDirection {
    /// Yields rise.
    Up,
    /// Yields fall.
    Down,
    /// Uniform shift with no explicit sign; treated as [`ShockDirection::Up`].
    #[default]
    Parallel,
}

impl ShockDirection {
    /// Sign applied to the shock magnitude.
    pub fn sign(self) -> f64 {
        match self {
            ShockDirection::Up | ShockDirection::Parallel => 1.0,
            ShockDirection::Down => -1.0,
        }
    }

    /// Lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            ShockDirection::Up => "up",
            ShockDirection::Down => "down",
            ShockDirection::Parallel => "parallel",
        }
    }
}

impl fmt::Display for ShockDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShockDirection {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(ShockDirection::Up),
            "down" => Ok(ShockDirection::Down),
            "parallel" | "" => Ok(ShockDirection::Parallel),
            other => Err(RiskError::invalid_argument(format!(
                "unknown shock direction '{other}', expected up, down or parallel"
            ))),
        }
    }
}

/// Portfolio risk snapshot.
///
/// VaR figures are positive currency amounts (potential loss).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    /// One-day VaR at 95% confidence.
    pub var_95: f64,
    /// One-day VaR at 99% confidence.
    pub var_99: f64,
    /// Modified duration in years.
    pub duration: f64,
    /// Convexity.
    pub convexity: f64,
    /// Currency change for a 1bp parallel rise, reported as a positive number
    /// for long positions.
    pub dv01: f64,
    /// When the computation started.
    pub calculated_at: DateTime<Utc>,
}

/// Outcome of a single curve shock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressResult {
    /// Shock magnitude in basis points.
    pub shock_bps: i32,
    /// Shock direction.
    pub direction: ShockDirection,
    /// Portfolio value on the live curve.
    pub original_value: f64,
    /// Portfolio value on the shocked curve.
    pub stressed_value: f64,
    /// `stressed_value - original_value`.
    pub pnl: f64,
    /// `pnl / original_value` as a fraction; 0 when the original value is 0.
    pub pnl_percent: f64,
    /// When the computation started.
    pub calculated_at: DateTime<Utc>,
}

impl StressResult {
    /// True if the shock produced a loss.
    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }
}

/// Front-end rate of the live curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentRate {
    /// Yield at the shortest curve tenor.
    pub rate: f64,
    /// Tenor the rate was read at, in years.
    pub tenor: f64,
    /// When the live curve was last installed.
    pub last_updated: DateTime<Utc>,
}
