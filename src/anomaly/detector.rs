//! Mean/standard-deviation threshold detector
//!
//! Flags values above `mean + tolerance * std`, with the statistics taken
//! over the whole series or over a trailing window.

use std::collections::BTreeMap;

use tracing::debug;

use super::{validate_tolerance, validate_window, AnomalyDetector, AnomalyReport, DetectionConfig, Threshold};
use crate::data::{mean, rolling_mean, rolling_std, std_dev, TimeSeries};
use crate::error::{Error, Result};

/// Threshold anomaly detector
///
/// With a window the threshold follows the trailing rolling mean and
/// standard deviation (the window includes the current reading); the
/// first `window - 1` thresholds are undefined and never flag.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdDetector {
    tolerance: f64,
    window: Option<usize>,
}

impl ThresholdDetector {
    /// Create a detector
    ///
    /// # Arguments
    /// * `tolerance` - Number of standard deviations above the mean
    /// * `window` - Trailing window size, or `None` for whole-series statistics
    pub fn new(tolerance: f64, window: Option<usize>) -> Result<Self> {
        validate_tolerance(tolerance)?;
        validate_window(window)?;
        Ok(Self { tolerance, window })
    }

    /// Whole-series statistics
    pub fn global(tolerance: f64) -> Result<Self> {
        Self::new(tolerance, None)
    }

    /// Trailing-window statistics
    pub fn rolling(tolerance: f64, window: usize) -> Result<Self> {
        Self::new(tolerance, Some(window))
    }

    /// Detector for the tolerance and window of `config`
    pub fn from_config(config: &DetectionConfig) -> Result<Self> {
        Self::new(config.tolerance, config.window)
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn window(&self) -> Option<usize> {
        self.window
    }

    /// Compute the threshold(s) for the given readings
    pub fn thresholds(&self, values: &[f64]) -> Result<Threshold> {
        match self.window {
            None => {
                if values.is_empty() {
                    return Err(Error::insufficient_data(1, 0));
                }
                let m = mean(values);
                let s = std_dev(values);
                debug!(mean = m, std = s, "Global statistics");
                Ok(Threshold::Global(m + self.tolerance * s))
            }
            Some(window) => {
                if values.len() < window {
                    return Err(Error::insufficient_data(window, values.len()));
                }
                let means = rolling_mean(values, window);
                let stds = rolling_std(values, window);
                Ok(Threshold::Rolling(
                    means
                        .iter()
                        .zip(&stds)
                        .map(|(m, s)| m + self.tolerance * s)
                        .collect(),
                ))
            }
        }
    }
}

impl AnomalyDetector for ThresholdDetector {
    fn detect(&self, series: &TimeSeries) -> Result<AnomalyReport> {
        let values = series.values();
        let threshold = self.thresholds(values)?;

        // NaN on either side compares false, so undefined thresholds and
        // missing readings never flag.
        let anomalies: BTreeMap<usize, f64> = values
            .iter()
            .enumerate()
            .filter(|&(i, &v)| v > threshold.at(i))
            .map(|(i, &v)| (i, v))
            .collect();

        debug!(
            detector = self.name(),
            tolerance = self.tolerance,
            window = ?self.window,
            flagged = anomalies.len(),
            "Detection finished"
        );

        Ok(AnomalyReport::new(anomalies, threshold, values.len()))
    }

    fn name(&self) -> &str {
        match self.window {
            Some(_) => "RollingThreshold",
            None => "GlobalThreshold",
        }
    }
}

/// Flag readings above the configured threshold.
///
/// Uses the tolerance and window of `config`; the period is ignored here.
pub fn detect(series: &TimeSeries, config: &DetectionConfig) -> Result<AnomalyReport> {
    ThresholdDetector::from_config(config)?.detect(series)
}
