//! Curve sources.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;

use bondrisk_core::{CurvePoint, YieldCurve};
use bondrisk_traits::{CurveSource, TraitError};

// =============================================================================
// CSV CURVE SOURCE
// =============================================================================

/// CSV record for curve points.
#[derive(Debug, Deserialize)]
struct CurveRecord {
    tenor_years: f64,
    #[serde(rename = "yield")]
    rate: f64,
}

/// Curve read from a CSV file with `tenor_years,yield` columns.
///
/// The file is re-read on every fetch, so edits are picked up by the next
/// refresh.
pub struct CsvCurveSource {
    file_path: PathBuf,
    curve_name: String,
    as_of: Option<NaiveDate>,
}

impl CsvCurveSource {
    /// Create a source for `file_path`.
    pub fn new(file_path: impl AsRef<Path>, curve_name: impl Into<String>) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
            curve_name: curve_name.into(),
            as_of: None,
        }
    }

    /// Pin the as-of date instead of using today's date.
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    /// Parse curve points from CSV bytes.
    pub fn parse_points(bytes: &[u8]) -> Result<Vec<CurvePoint>, TraitError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let mut points = Vec::new();
        for result in reader.deserialize() {
            let record: CurveRecord = result.map_err(|e| TraitError::ParseError(e.to_string()))?;
            points.push(CurvePoint::new(record.tenor_years, record.rate));
        }
        points.sort_by(|a, b| a.tenor.total_cmp(&b.tenor));
        Ok(points)
    }
}

#[async_trait]
impl CurveSource for CsvCurveSource {
    fn source_name(&self) -> &'static str {
        "csv"
    }

    async fn latest_curve(&self) -> Result<YieldCurve, TraitError> {
        let bytes = tokio::fs::read(&self.file_path).await.map_err(|e| {
            TraitError::SourceNotAvailable(format!("{}: {e}", self.file_path.display()))
        })?;
        let points = Self::parse_points(&bytes)?;
        let as_of = self.as_of.unwrap_or_else(|| Utc::now().date_naive());

        debug!(
            path = %self.file_path.display(),
            points = points.len(),
            "loaded curve"
        );

        let curve = YieldCurve::new(self.curve_name.clone(), as_of, points)?;
        curve.ensure_usable()?;
        Ok(curve)
    }
}

// =============================================================================
// STATIC CURVE SOURCE
// =============================================================================

/// Always returns the same curve.
pub struct StaticCurveSource {
    curve: YieldCurve,
}

impl StaticCurveSource {
    /// Wrap a curve.
    pub fn new(curve: YieldCurve) -> Self {
        Self { curve }
    }
}

#[async_trait]
impl CurveSource for StaticCurveSource {
    fn source_name(&self) -> &'static str {
        "static"
    }

    async fn latest_curve(&self) -> Result<YieldCurve, TraitError> {
        Ok(self.curve.clone())
    }
}
