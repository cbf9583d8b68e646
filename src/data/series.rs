//! Time series container
//!
//! An ordered sequence of readings, optionally stamped with strictly
//! increasing UTC timestamps. Without timestamps the sampling interval is
//! implicit and uniform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ordered sequence of sensor readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamps: Option<Vec<DateTime<Utc>>>,
}

impl TimeSeries {
    /// Create a series with an implicit uniform sampling interval
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            timestamps: None,
        }
    }

    /// Create a timestamped series
    ///
    /// Fails if the lengths differ or the timestamps are not strictly
    /// increasing.
    pub fn with_timestamps(values: Vec<f64>, timestamps: Vec<DateTime<Utc>>) -> Result<Self> {
        if values.len() != timestamps.len() {
            return Err(Error::InvalidSeries(format!(
                "{} values but {} timestamps",
                values.len(),
                timestamps.len()
            )));
        }

        if let Some(i) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(Error::InvalidSeries(format!(
                "timestamps not strictly increasing at index {} ({} -> {})",
                i + 1,
                timestamps[i],
                timestamps[i + 1]
            )));
        }

        Ok(Self {
            values,
            timestamps: Some(timestamps),
        })
    }

    /// Build a series sharing this one's timestamps but with new values.
    ///
    /// Used to carry timestamps over to derived series such as the
    /// decomposition remainder.
    pub(crate) fn with_values(&self, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), self.values.len());
        Self {
            values,
            timestamps: self.timestamps.clone(),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn timestamps(&self) -> Option<&[DateTime<Utc>]> {
        self.timestamps.as_deref()
    }

    /// Timestamp at `index`, if the series carries timestamps
    pub fn timestamp_at(&self, index: usize) -> Option<DateTime<Utc>> {
        self.timestamps.as_ref().and_then(|ts| ts.get(index).copied())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of NaN readings
    pub fn nan_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

impl From<Vec<f64>> for TimeSeries {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl From<&[f64]> for TimeSeries {
    fn from(values: &[f64]) -> Self {
        Self::new(values.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn hourly(n: usize) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2015, 1, 1, 6, 0, 0).unwrap();
        (0..n).map(|i| start + Duration::hours(i as i64)).collect()
    }

    #[test]
    fn test_timestamped_series() {
        let series = TimeSeries::with_timestamps(vec![1.0, 2.0, 3.0], hourly(3)).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.timestamp_at(2), Some(hourly(3)[2]));
        assert_eq!(series.timestamp_at(3), None);
    }

    #[test]
    fn test_length_mismatch() {
        let result = TimeSeries::with_timestamps(vec![1.0, 2.0], hourly(3));
        assert!(matches!(result, Err(Error::InvalidSeries(_))));
    }

    #[test]
    fn test_non_increasing_timestamps() {
        let mut ts = hourly(4);
        ts[2] = ts[1];
        let result = TimeSeries::with_timestamps(vec![0.0; 4], ts);
        assert!(matches!(result, Err(Error::InvalidSeries(_))));
    }

    #[test]
    fn test_derived_series_keeps_timestamps() {
        let series = TimeSeries::with_timestamps(vec![1.0, 2.0], hourly(2)).unwrap();
        let derived = series.with_values(vec![0.5, 0.25]);
        assert_eq!(derived.timestamps(), series.timestamps());
        assert_eq!(derived.values(), &[0.5, 0.25]);
    }

    #[test]
    fn test_nan_count() {
        let series = TimeSeries::new(vec![1.0, f64::NAN, 3.0, f64::NAN]);
        assert_eq!(series.nan_count(), 2);
    }
}
