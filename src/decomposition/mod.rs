//! Seasonal-trend decomposition of time series
//!
//! Splits a series into trend, seasonal and remainder components with
//! `Y = T + S + R` holding at every index.

mod loess;
mod stl;

pub use stl::*;

use serde::Serialize;

/// Result of decomposing a series; immutable once built
#[derive(Debug, Clone, Serialize)]
pub struct DecompositionResult {
    trend: Vec<f64>,
    seasonal: Vec<f64>,
    remainder: Vec<f64>,
    period: usize,
}

impl DecompositionResult {
    pub(crate) fn new(trend: Vec<f64>, seasonal: Vec<f64>, remainder: Vec<f64>, period: usize) -> Self {
        debug_assert!(trend.len() == seasonal.len() && seasonal.len() == remainder.len());
        Self {
            trend,
            seasonal,
            remainder,
            period,
        }
    }

    pub fn trend(&self) -> &[f64] {
        &self.trend
    }

    pub fn seasonal(&self) -> &[f64] {
        &self.seasonal
    }

    pub fn remainder(&self) -> &[f64] {
        &self.remainder
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn len(&self) -> usize {
        self.remainder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remainder.is_empty()
    }

    pub fn into_remainder(self) -> Vec<f64> {
        self.remainder
    }

    /// Sum of the three components
    pub fn reconstruct(&self) -> Vec<f64> {
        self.trend
            .iter()
            .zip(&self.seasonal)
            .zip(&self.remainder)
            .map(|((t, s), r)| t + s + r)
            .collect()
    }

    /// Strength of trend in [0, 1]: `1 - Var(R) / Var(T + R)`
    pub fn trend_strength(&self) -> f64 {
        let deseasonalized: Vec<f64> = self
            .trend
            .iter()
            .zip(&self.remainder)
            .map(|(t, r)| t + r)
            .collect();
        strength(&self.remainder, &deseasonalized)
    }

    /// Strength of seasonality in [0, 1]: `1 - Var(R) / Var(S + R)`
    pub fn seasonal_strength(&self) -> f64 {
        let detrended: Vec<f64> = self
            .seasonal
            .iter()
            .zip(&self.remainder)
            .map(|(s, r)| s + r)
            .collect();
        strength(&self.remainder, &detrended)
    }
}

fn strength(remainder: &[f64], combined: &[f64]) -> f64 {
    let var_remainder = variance(remainder);
    let var_combined = variance(combined);

    if var_combined == 0.0 || var_combined.is_nan() {
        return 0.0;
    }

    (1.0 - var_remainder / var_combined).max(0.0)
}

fn variance(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = data.iter().sum::<f64>() / data.len() as f64;
    data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64
}
