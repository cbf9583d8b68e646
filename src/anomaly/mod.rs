//! Outlier detection
//!
//! Flags readings that sit more than `tolerance` standard deviations above
//! the mean, computed either over the whole series or over a trailing
//! window. Detection is one-sided: only upward excursions are reported.

mod detector;
mod evaluation;

pub use detector::*;
pub use evaluation::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::TimeSeries;
use crate::error::{Error, Result};

/// Parameters of a detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Number of standard deviations above the mean that counts as anomalous
    pub tolerance: f64,
    /// Trailing window for rolling statistics; `None` uses the whole series
    pub window: Option<usize>,
    /// Seasonal cycle length in samples; `None` skips decomposition
    pub period: Option<usize>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            tolerance: 4.0,
            window: None,
            period: None,
        }
    }
}

impl DetectionConfig {
    /// Global detection with the given tolerance and no decomposition
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            ..Self::default()
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_period(mut self, period: usize) -> Self {
        self.period = Some(period);
        self
    }

    /// Check every field against its constraint
    pub fn validate(&self) -> Result<()> {
        validate_tolerance(self.tolerance)?;
        validate_window(self.window)?;
        if self.period == Some(0) {
            return Err(Error::invalid_parameter("period must be a positive integer"));
        }
        Ok(())
    }
}

pub(crate) fn validate_tolerance(tolerance: f64) -> Result<()> {
    if !tolerance.is_finite() || tolerance <= 0.0 {
        return Err(Error::invalid_parameter(format!(
            "tolerance must be a positive number, got {}",
            tolerance
        )));
    }
    Ok(())
}

pub(crate) fn validate_window(window: Option<usize>) -> Result<()> {
    if window == Some(0) {
        return Err(Error::invalid_parameter("window must be a positive integer"));
    }
    Ok(())
}

/// Threshold a detection run compared readings against
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    /// One value for the whole series
    Global(f64),
    /// One value per index; NaN where the window is not yet full
    Rolling(Vec<f64>),
}

impl Threshold {
    /// Threshold applied at `index` (NaN if undefined there)
    pub fn at(&self, index: usize) -> f64 {
        match self {
            Threshold::Global(t) => *t,
            Threshold::Rolling(ts) => ts.get(index).copied().unwrap_or(f64::NAN),
        }
    }

    pub fn is_rolling(&self) -> bool {
        matches!(self, Threshold::Rolling(_))
    }
}

// Undefined (NaN) entries compare equal to each other so that two runs over
// the same input produce equal reports.
impl PartialEq for Threshold {
    fn eq(&self, other: &Self) -> bool {
        fn same(a: f64, b: f64) -> bool {
            a == b || (a.is_nan() && b.is_nan())
        }

        match (self, other) {
            (Threshold::Global(a), Threshold::Global(b)) => same(*a, *b),
            (Threshold::Rolling(a), Threshold::Rolling(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same(*x, *y))
            }
            _ => false,
        }
    }
}

/// Outcome of a detection run; immutable once built
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyReport {
    anomalies: BTreeMap<usize, f64>,
    threshold: Threshold,
    series_len: usize,
}

impl AnomalyReport {
    pub(crate) fn new(anomalies: BTreeMap<usize, f64>, threshold: Threshold, series_len: usize) -> Self {
        Self {
            anomalies,
            threshold,
            series_len,
        }
    }

    /// Flagged index -> observed value, in index order
    pub fn anomalies(&self) -> &BTreeMap<usize, f64> {
        &self.anomalies
    }

    pub fn threshold(&self) -> &Threshold {
        &self.threshold
    }

    /// Indices of anomalies
    pub fn indices(&self) -> Vec<usize> {
        self.anomalies.keys().copied().collect()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.anomalies.contains_key(&index)
    }

    /// Number of detected anomalies
    pub fn count(&self) -> usize {
        self.anomalies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anomalies.is_empty()
    }

    /// Length of the series that was examined
    pub fn series_len(&self) -> usize {
        self.series_len
    }

    /// Fraction of examined readings that were flagged
    pub fn anomaly_rate(&self) -> f64 {
        if self.series_len == 0 {
            0.0
        } else {
            self.count() as f64 / self.series_len as f64
        }
    }

    /// How far above its threshold each anomaly sits
    pub fn excess(&self) -> Vec<(usize, f64)> {
        self.anomalies
            .iter()
            .map(|(&i, &v)| (i, v - self.threshold.at(i)))
            .collect()
    }
}

/// Trait for anomaly detectors
pub trait AnomalyDetector {
    /// Detect anomalies in the given series
    fn detect(&self, series: &TimeSeries) -> Result<AnomalyReport>;

    /// Get the name of the detector
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(DetectionConfig::new(4.0).validate().is_ok());
        assert!(DetectionConfig::new(4.0).with_window(12).with_period(24).validate().is_ok());

        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                DetectionConfig::new(bad).validate(),
                Err(Error::InvalidParameter(_))
            ));
        }
        assert!(DetectionConfig::new(4.0).with_window(0).validate().is_err());
        assert!(DetectionConfig::new(4.0).with_period(0).validate().is_err());
    }

    #[test]
    fn test_config_from_toml() {
        let config: DetectionConfig = toml::from_str("tolerance = 2.5\nwindow = 24").unwrap();
        assert_eq!(config, DetectionConfig::new(2.5).with_window(24));
    }

    #[test]
    fn test_threshold_lookup() {
        assert_eq!(Threshold::Global(1.5).at(1000), 1.5);

        let rolling = Threshold::Rolling(vec![f64::NAN, 2.0]);
        assert!(rolling.at(0).is_nan());
        assert_eq!(rolling.at(1), 2.0);
        assert!(rolling.at(2).is_nan());
        assert!(rolling.is_rolling());
        assert_eq!(rolling, Threshold::Rolling(vec![f64::NAN, 2.0]));
        assert_ne!(rolling, Threshold::Rolling(vec![1.0, 2.0]));
    }

    #[test]
    fn test_report_accessors() {
        let mut anomalies = BTreeMap::new();
        anomalies.insert(7, 9.0);
        anomalies.insert(3, 6.0);
        let report = AnomalyReport::new(anomalies, Threshold::Global(5.0), 10);

        assert_eq!(report.indices(), vec![3, 7]);
        assert!(report.contains(7));
        assert_eq!(report.count(), 2);
        assert!((report.anomaly_rate() - 0.2).abs() < 1e-12);
        assert_eq!(report.excess(), vec![(3, 1.0), (7, 4.0)]);
    }
}
