//! Live curve snapshot and curve shocks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use bondrisk_core::{RiskError, ShockDirection, YieldCurve, ONE_BP};

struct LiveCurve {
    curve: Arc<YieldCurve>,
    installed_at: DateTime<Utc>,
}

/// Holds the process-wide live curve.
///
/// Readers get an `Arc` snapshot that stays valid and unchanged for as long
/// as they hold it, so a refresh never shows up half way through a
/// computation.
pub struct YieldCurveProvider {
    live: RwLock<LiveCurve>,
}

impl YieldCurveProvider {
    /// Create a provider with an initial curve.
    pub fn new(curve: YieldCurve) -> Result<Self, RiskError> {
        Self::with_timestamp(curve, Utc::now())
    }

    /// Create a provider with an explicit installation time.
    pub fn with_timestamp(curve: YieldCurve, installed_at: DateTime<Utc>) -> Result<Self, RiskError> {
        curve.ensure_usable()?;
        Ok(Self {
            live: RwLock::new(LiveCurve {
                curve: Arc::new(curve),
                installed_at,
            }),
        })
    }

    /// The live curve.
    pub fn current(&self) -> Arc<YieldCurve> {
        self.live.read().curve.clone()
    }

    /// The live curve together with the time it was installed.
    pub fn snapshot(&self) -> (Arc<YieldCurve>, DateTime<Utc>) {
        let live = self.live.read();
        (live.curve.clone(), live.installed_at)
    }

    /// When the live curve was installed.
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.live.read().installed_at
    }

    /// Install a refreshed curve. Existing snapshots are unaffected.
    pub fn replace(&self, curve: YieldCurve, installed_at: DateTime<Utc>) -> Result<(), RiskError> {
        curve.ensure_usable()?;
        debug!(
            curve = curve.name(),
            as_of = %curve.as_of(),
            points = curve.len(),
            "installing live curve"
        );
        *self.live.write() = LiveCurve {
            curve: Arc::new(curve),
            installed_at,
        };
        Ok(())
    }

    /// A new curve with every yield moved by `bps` basis points.
    ///
    /// `Up` and `Parallel` add, `Down` subtracts. The input is never
    /// modified. Fails with [`RiskError::InvalidArgument`] for `bps < 0`.
    pub fn shock(
        curve: &YieldCurve,
        bps: i32,
        direction: ShockDirection,
    ) -> Result<YieldCurve, RiskError> {
        if bps < 0 {
            return Err(RiskError::invalid_argument(format!(
                "shock must be non-negative, got {bps}bps"
            )));
        }
        Ok(curve.shifted(direction.sign() * f64::from(bps) * ONE_BP))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bondrisk_core::CurvePoint;
    use chrono::NaiveDate;

    fn curve(rate: f64) -> YieldCurve {
        YieldCurve::new(
            "USD",
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            vec![CurvePoint::new(1.0, rate), CurvePoint::new(10.0, rate + 0.01)],
        )
        .unwrap()
    }

    #[test]
    fn test_shock_up_and_down() {
        let base = curve(0.03);
        let up = YieldCurveProvider::shock(&base, 100, ShockDirection::Up).unwrap();
        let down = YieldCurveProvider::shock(&base, 100, ShockDirection::Down).unwrap();
        let parallel = YieldCurveProvider::shock(&base, 100, ShockDirection::Parallel).unwrap();

        assert_relative_eq!(up.points()[0].rate, 0.04, epsilon = 1e-12);
        assert_relative_eq!(down.points()[1].rate, 0.03, epsilon = 1e-12);
        assert_eq!(parallel, up);
        assert_relative_eq!(base.points()[0].rate, 0.03);
    }

    #[test]
    fn test_zero_shock_is_identity() {
        let base = curve(0.03);
        let shocked = YieldCurveProvider::shock(&base, 0, ShockDirection::Up).unwrap();
        assert_eq!(shocked, base);
    }

    #[test]
    fn test_negative_shock_rejected() {
        let result = YieldCurveProvider::shock(&curve(0.03), -5, ShockDirection::Up);
        assert!(matches!(result, Err(RiskError::InvalidArgument(_))));
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let provider = YieldCurveProvider::new(curve(0.03)).unwrap();
        let before = provider.current();

        provider.replace(curve(0.05), Utc::now()).unwrap();

        assert_relative_eq!(before.points()[0].rate, 0.03);
        assert_relative_eq!(provider.current().points()[0].rate, 0.05);
    }

    #[test]
    fn test_replace_rejects_unusable_curve() {
        let provider = YieldCurveProvider::new(curve(0.03)).unwrap();
        let empty = YieldCurve::new(
            "empty",
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            Vec::new(),
        )
        .unwrap();
        assert!(provider.replace(empty, Utc::now()).is_err());
        assert_relative_eq!(provider.current().points()[0].rate, 0.03);
    }
}
