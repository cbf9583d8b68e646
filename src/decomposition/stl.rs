//! STL: Seasonal-Trend decomposition using Loess
//!
//! Follows Cleveland, Cleveland, McRae & Terpenning (1990). An inner loop
//! alternates seasonal smoothing of the cycle-subseries with trend
//! smoothing of the deseasonalized series; an outer loop recomputes
//! bisquare robustness weights from the remainder so that outliers stop
//! pulling the trend and seasonal estimates towards themselves.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::loess::{local_fit, smooth};
use super::DecompositionResult;
use crate::data::{median, moving_average, TimeSeries};
use crate::error::{Error, Result};

/// Tuning parameters for STL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StlParams {
    /// Loess span across cycles for each cycle-subseries (odd, >= 3)
    pub seasonal_span: usize,
    /// Loess span of the trend smoother; derived from the period if absent
    pub trend_span: Option<usize>,
    /// Loess span of the low-pass filter; derived from the period if absent
    pub low_pass_span: Option<usize>,
    /// Local polynomial degree (0 or 1) of the seasonal smoother
    pub seasonal_degree: usize,
    /// Local polynomial degree (0 or 1) of the trend smoother
    pub trend_degree: usize,
    /// Local polynomial degree (0 or 1) of the low-pass smoother
    pub low_pass_degree: usize,
    /// Passes of the inner loop per robustness iteration
    pub inner_iterations: usize,
    /// Robustness iterations; 0 disables outlier downweighting
    pub outer_iterations: usize,
}

impl Default for StlParams {
    fn default() -> Self {
        Self {
            seasonal_span: 7,
            trend_span: None,
            low_pass_span: None,
            seasonal_degree: 1,
            trend_degree: 1,
            low_pass_degree: 1,
            inner_iterations: 2,
            outer_iterations: 15,
        }
    }
}

/// Concrete spans for one period
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spans {
    pub seasonal: usize,
    pub trend: usize,
    pub low_pass: usize,
}

impl StlParams {
    /// Non-robust variant: more inner passes, no robustness weights
    pub fn non_robust() -> Self {
        Self {
            inner_iterations: 5,
            outer_iterations: 0,
            ..Self::default()
        }
    }

    /// Validate the parameters and work out the spans for `period`
    pub fn spans(&self, period: usize) -> Result<Spans> {
        check_span("seasonal_span", self.seasonal_span)?;
        for (name, degree) in [
            ("seasonal_degree", self.seasonal_degree),
            ("trend_degree", self.trend_degree),
            ("low_pass_degree", self.low_pass_degree),
        ] {
            if degree > 1 {
                return Err(Error::invalid_parameter(format!(
                    "{} must be 0 or 1, got {}",
                    name, degree
                )));
            }
        }
        if self.inner_iterations == 0 {
            return Err(Error::invalid_parameter("inner_iterations must be positive"));
        }

        let seasonal = self.seasonal_span;
        let trend = match self.trend_span {
            Some(span) => check_span("trend_span", span)?,
            None => {
                let p = period as f64;
                next_odd(1.5 * p / (1.0 - 1.5 / seasonal as f64))
            }
        };
        let low_pass = match self.low_pass_span {
            Some(span) => check_span("low_pass_span", span)?,
            None => next_odd(period as f64),
        };

        Ok(Spans {
            seasonal,
            trend,
            low_pass,
        })
    }
}

fn check_span(name: &str, span: usize) -> Result<usize> {
    if span < 3 || span % 2 == 0 {
        return Err(Error::invalid_parameter(format!(
            "{} must be an odd integer >= 3, got {}",
            name, span
        )));
    }
    Ok(span)
}

/// Smallest odd integer >= x, at least 3
fn next_odd(x: f64) -> usize {
    let v = x.ceil().max(3.0) as usize;
    if v % 2 == 0 {
        v + 1
    } else {
        v
    }
}

/// STL decomposer
#[derive(Debug, Clone, Default)]
pub struct Decomposer {
    params: StlParams,
}

impl Decomposer {
    pub fn new(params: StlParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &StlParams {
        &self.params
    }

    /// Decompose `series` into trend, seasonal and remainder.
    ///
    /// Needs at least two full cycles. NaN readings are not treated
    /// specially and spread into every component whose smoothing
    /// neighbourhood touches them.
    pub fn decompose(&self, series: &TimeSeries, period: usize) -> Result<DecompositionResult> {
        if period == 0 {
            return Err(Error::invalid_parameter("period must be a positive integer"));
        }

        let y = series.values();
        let n = y.len();
        let required = period.checked_mul(2).unwrap_or(usize::MAX);
        if n < required {
            return Err(Error::insufficient_data(required, n));
        }

        let spans = self.params.spans(period)?;
        let nan_count = series.nan_count();
        if nan_count > 0 {
            warn!(nan_count, "Series contains NaN; it will propagate through the decomposition");
        }
        debug!(
            n,
            period,
            seasonal_span = spans.seasonal,
            trend_span = spans.trend,
            low_pass_span = spans.low_pass,
            "Running STL decomposition"
        );

        let mut trend = vec![0.0; n];
        let mut seasonal = vec![0.0; n];
        let mut weights: Option<Vec<f64>> = None;

        let mut outer = 0;
        loop {
            for _ in 0..self.params.inner_iterations {
                self.inner_pass(y, period, spans, weights.as_deref(), &mut trend, &mut seasonal);
            }

            if outer == self.params.outer_iterations {
                break;
            }
            outer += 1;

            let rw = robustness_weights(y, &trend, &seasonal);
            trace!(
                iteration = outer,
                zero_weights = rw.iter().filter(|&&w| w == 0.0).count(),
                "Updated robustness weights"
            );
            weights = Some(rw);
        }

        let remainder: Vec<f64> = y
            .iter()
            .zip(trend.iter().zip(&seasonal))
            .map(|(&v, (&t, &s))| v - t - s)
            .collect();

        Ok(DecompositionResult::new(trend, seasonal, remainder, period))
    }

    fn inner_pass(
        &self,
        y: &[f64],
        period: usize,
        spans: Spans,
        weights: Option<&[f64]>,
        trend: &mut [f64],
        seasonal: &mut [f64],
    ) {
        let detrended: Vec<f64> = y.iter().zip(trend.iter()).map(|(v, t)| v - t).collect();

        let cycle = cycle_subseries(
            &detrended,
            period,
            spans.seasonal,
            self.params.seasonal_degree,
            weights,
        );
        let low = low_pass(&cycle, period, spans.low_pass, self.params.low_pass_degree);

        for (i, s) in seasonal.iter_mut().enumerate() {
            *s = cycle[period + i] - low[i];
        }

        let deseasonalized: Vec<f64> = y.iter().zip(seasonal.iter()).map(|(v, s)| v - s).collect();
        let smoothed = smooth(&deseasonalized, spans.trend, self.params.trend_degree, weights);
        trend.copy_from_slice(&smoothed);
    }
}

/// Decompose with default STL parameters
pub fn decompose(series: &TimeSeries, period: usize) -> Result<DecompositionResult> {
    Decomposer::default().decompose(series, period)
}

/// Smooth each cycle-subseries (all samples sharing a phase) and extend it
/// by one cycle at either end. Output has `n + 2 * period` entries, laid
/// out so that entry `period + i` lines up with input `i`.
fn cycle_subseries(
    values: &[f64],
    period: usize,
    span: usize,
    degree: usize,
    weights: Option<&[f64]>,
) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![0.0; n + 2 * period];

    for phase in 0..period {
        let sub: Vec<f64> = values.iter().skip(phase).step_by(period).copied().collect();
        let sub_weights: Option<Vec<f64>> =
            weights.map(|w| w.iter().skip(phase).step_by(period).copied().collect());
        let rw = sub_weights.as_deref();
        let k = sub.len();

        let smoothed = smooth(&sub, span, degree, rw);

        let right = span.min(k) - 1;
        let first = local_fit(&sub, span, degree, -1.0, 0, right, rw).unwrap_or(smoothed[0]);
        let left = k.saturating_sub(span);
        let last = local_fit(&sub, span, degree, k as f64, left, k - 1, rw).unwrap_or(smoothed[k - 1]);

        out[phase] = first;
        for (m, v) in smoothed.iter().enumerate() {
            out[(m + 1) * period + phase] = *v;
        }
        out[(k + 1) * period + phase] = last;
    }

    out
}

/// Moving averages of length `period`, `period` and 3 followed by loess;
/// maps the `n + 2 * period` cycle-subseries back to `n` points.
fn low_pass(cycle: &[f64], period: usize, span: usize, degree: usize) -> Vec<f64> {
    let ma = moving_average(cycle, period);
    let ma = moving_average(&ma, period);
    let ma = moving_average(&ma, 3);
    smooth(&ma, span, degree, None)
}

/// Bisquare weights on |remainder| scaled by six times its median
fn robustness_weights(y: &[f64], trend: &[f64], seasonal: &[f64]) -> Vec<f64> {
    let residuals: Vec<f64> = y
        .iter()
        .zip(trend.iter().zip(seasonal))
        .map(|(&v, (&t, &s))| (v - t - s).abs())
        .collect();

    // Floor the scale so residuals at rounding level keep full weight when
    // the fit is otherwise exact.
    let magnitude = y
        .iter()
        .filter(|v| v.is_finite())
        .fold(0.0f64, |acc, v| acc.max(v.abs()));
    let h = (6.0 * median(&residuals)).max(1e-10 * magnitude.max(1.0));
    let c9 = 0.999 * h;
    let c1 = 0.001 * h;

    residuals
        .iter()
        .map(|&r| {
            if r <= c1 {
                1.0
            } else if r <= c9 {
                (1.0 - (r / h).powi(2)).powi(2)
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_default_spans() {
        let spans = StlParams::default().spans(12).unwrap();
        assert_eq!(spans.seasonal, 7);
        // 1.5 * 12 / (1 - 1.5 / 7) = 22.9 -> 23
        assert_eq!(spans.trend, 23);
        assert_eq!(spans.low_pass, 13);
    }

    #[test]
    fn test_spans_for_small_period() {
        let spans = StlParams::default().spans(1).unwrap();
        assert_eq!(spans.trend, 3);
        assert_eq!(spans.low_pass, 3);
    }

    #[test]
    fn test_invalid_params() {
        let even = StlParams {
            seasonal_span: 8,
            ..Default::default()
        };
        assert!(matches!(even.spans(12), Err(Error::InvalidParameter(_))));

        let quadratic = StlParams {
            trend_degree: 2,
            ..Default::default()
        };
        assert!(matches!(quadratic.spans(12), Err(Error::InvalidParameter(_))));

        let no_inner = StlParams {
            inner_iterations: 0,
            ..Default::default()
        };
        assert!(matches!(no_inner.spans(12), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_cycle_subseries_layout() {
        // two phases, constant within each phase
        let values = vec![1.0, 5.0, 1.0, 5.0, 1.0, 5.0];
        let cycle = cycle_subseries(&values, 2, 7, 1, None);
        assert_eq!(cycle.len(), 10);
        for (i, v) in cycle.iter().enumerate() {
            let expected = if i % 2 == 0 { 1.0 } else { 5.0 };
            assert!((v - expected).abs() < 1e-9, "cycle[{}] = {}", i, v);
        }
    }

    #[test]
    fn test_low_pass_length() {
        let cycle = vec![1.0; 10 + 2 * 4];
        let low = low_pass(&cycle, 4, 5, 1);
        assert_eq!(low.len(), 10);
        assert!(low.iter().all(|v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_robustness_weights_zero_out_outlier() {
        let y = vec![0.1, -0.1, 0.2, -0.2, 0.1, 50.0, -0.1, 0.15];
        let zeros = vec![0.0; y.len()];
        let w = robustness_weights(&y, &zeros, &zeros);
        assert_eq!(w[5], 0.0);
        assert!(w[0] > 0.9);
    }

    #[test]
    fn test_trend_plus_season_recovered() {
        let period = 12;
        let data: Vec<f64> = (0..96)
            .map(|i| 10.0 + 0.1 * i as f64 + 3.0 * (2.0 * PI * i as f64 / period as f64).sin())
            .collect();
        let result = decompose(&TimeSeries::new(data), period).unwrap();

        let max_remainder = result
            .remainder()
            .iter()
            .fold(0.0f64, |acc, r| acc.max(r.abs()));
        assert!(max_remainder < 0.5, "max remainder {}", max_remainder);
    }

    #[test]
    fn test_huge_period_is_insufficient_data() {
        let series = TimeSeries::new(vec![1.0; 10]);
        for period in [usize::MAX / 2 + 1, usize::MAX] {
            assert!(matches!(
                decompose(&series, period),
                Err(Error::InsufficientData { required: usize::MAX, actual: 10 })
            ));
        }
        assert!(matches!(
            decompose(&series, usize::MAX / 2),
            Err(Error::InsufficientData { required, actual: 10 }) if required == usize::MAX - 1
        ));
    }

    #[test]
    fn test_non_robust_decomposer() {
        let data: Vec<f64> = (0..48).map(|i| (i % 6) as f64).collect();
        let decomposer = Decomposer::new(StlParams::non_robust());
        let result = decomposer.decompose(&TimeSeries::new(data), 6).unwrap();
        assert_eq!(result.len(), 48);
    }
}
