//! Synthetic telemetry generation
//!
//! Gaussian noise plus optional trend, cosine seasonality and injected
//! spikes. Generation is seeded, so the same builder always yields the
//! same series.

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use super::TimeSeries;
use crate::error::{Error, Result};

/// A series together with the indices known to be anomalous
#[derive(Debug, Clone)]
pub struct LabeledSeries {
    pub series: TimeSeries,
    pub anomalies: BTreeSet<usize>,
}

/// Builder for synthetic sensor series
#[derive(Debug, Clone)]
pub struct SyntheticSeries {
    len: usize,
    seed: u64,
    noise_std: f64,
    clip: Option<f64>,
    trend_slope: f64,
    amplitude: f64,
    period: Option<usize>,
    spikes: BTreeMap<usize, f64>,
}

impl SyntheticSeries {
    /// Standard-normal noise of length `len`, nothing else
    pub fn new(len: usize) -> Self {
        Self {
            len,
            seed: 42,
            noise_std: 1.0,
            clip: None,
            trend_slope: 0.0,
            amplitude: 0.0,
            period: None,
            spikes: BTreeMap::new(),
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn noise_std(mut self, noise_std: f64) -> Self {
        self.noise_std = noise_std;
        self
    }

    /// Clamp each noise draw to `[-limit, limit]`
    pub fn clip_noise(mut self, limit: f64) -> Self {
        self.clip = Some(limit.abs());
        self
    }

    /// Add a linear trend of `slope` per sample
    pub fn trend(mut self, slope: f64) -> Self {
        self.trend_slope = slope;
        self
    }

    /// Add `amplitude * cos(2 pi i / period)`
    pub fn seasonal(mut self, amplitude: f64, period: usize) -> Self {
        self.amplitude = amplitude;
        self.period = Some(period);
        self
    }

    /// Replace the noise at `index` with `value`; seasonality and trend are
    /// still added on top.
    pub fn spike(mut self, index: usize, value: f64) -> Self {
        self.spikes.insert(index, value);
        self
    }

    pub fn generate(&self) -> Result<LabeledSeries> {
        let normal = Normal::new(0.0, self.noise_std)
            .map_err(|e| Error::invalid_parameter(format!("noise_std: {}", e)))?;
        if self.period == Some(0) {
            return Err(Error::invalid_parameter("seasonal period must be positive"));
        }
        if let Some(&index) = self.spikes.keys().find(|&&i| i >= self.len) {
            return Err(Error::invalid_parameter(format!(
                "spike index {} outside series of length {}",
                index, self.len
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);

        let values = (0..self.len)
            .map(|i| {
                let mut noise = normal.sample(&mut rng);
                if let Some(limit) = self.clip {
                    noise = noise.clamp(-limit, limit);
                }
                let base = self.spikes.get(&i).copied().unwrap_or(noise);

                let seasonal = match self.period {
                    Some(p) => self.amplitude * (2.0 * PI * i as f64 / p as f64).cos(),
                    None => 0.0,
                };

                base + seasonal + self.trend_slope * i as f64
            })
            .collect();

        Ok(LabeledSeries {
            series: TimeSeries::new(values),
            anomalies: self.spikes.keys().copied().collect(),
        })
    }
}
