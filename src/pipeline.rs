//! Decompose-then-detect pipeline
//!
//! With a period, the series is decomposed and the detector runs on the
//! remainder; without one, the detector runs on the raw series.

use serde::Serialize;
use tracing::{debug, info_span};

use crate::anomaly::{AnomalyDetector, AnomalyReport, DetectionConfig, ThresholdDetector};
use crate::data::TimeSeries;
use crate::decomposition::{Decomposer, DecompositionResult, StlParams};
use crate::error::Result;

/// Everything a pipeline run produced
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub report: AnomalyReport,
    /// Remainder after decomposition, or the input series when no period
    /// was configured
    pub remainder: TimeSeries,
    /// Full decomposition, when one was performed
    pub decomposition: Option<DecompositionResult>,
}

/// Pipeline with configurable decomposition parameters
#[derive(Debug, Clone, Default)]
pub struct AnomalyPipeline {
    config: DetectionConfig,
    decomposer: Decomposer,
}

impl AnomalyPipeline {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            decomposer: Decomposer::default(),
        }
    }

    pub fn with_stl_params(mut self, params: StlParams) -> Self {
        self.decomposer = Decomposer::new(params);
        self
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Run the pipeline. Errors from either stage are returned unchanged.
    pub fn run(&self, series: &TimeSeries) -> Result<PipelineOutput> {
        let span = info_span!("pipeline", n = series.len(), period = ?self.config.period);
        let _enter = span.enter();

        self.config.validate()?;
        let detector = ThresholdDetector::from_config(&self.config)?;

        match self.config.period {
            Some(period) => {
                let decomposition = self.decomposer.decompose(series, period)?;
                let remainder = series.with_values(decomposition.remainder().to_vec());
                let report = detector.detect(&remainder)?;
                debug!(
                    flagged = report.count(),
                    seasonal_strength = decomposition.seasonal_strength(),
                    "Detection on remainder finished"
                );
                Ok(PipelineOutput {
                    report,
                    remainder,
                    decomposition: Some(decomposition),
                })
            }
            None => {
                let report = detector.detect(series)?;
                debug!(flagged = report.count(), "Detection on raw series finished");
                Ok(PipelineOutput {
                    report,
                    remainder: series.clone(),
                    decomposition: None,
                })
            }
        }
    }
}

/// Decompose (if `config.period` is set) and detect on the remainder.
///
/// Returns the report together with the series the detector examined: the
/// remainder, or the original series when decomposition was skipped.
pub fn detect_anomalies_with_decomposition(
    series: &TimeSeries,
    config: &DetectionConfig,
) -> Result<(AnomalyReport, TimeSeries)> {
    let output = AnomalyPipeline::new(config.clone()).run(series)?;
    Ok((output.report, output.remainder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn sawtooth_with_spike(n: usize, period: usize, at: usize) -> TimeSeries {
        TimeSeries::new(
            (0..n)
                .map(|i| {
                    let base = (i % period) as f64;
                    if i == at {
                        base + 50.0
                    } else {
                        base
                    }
                })
                .collect(),
        )
    }

    #[test]
    fn test_without_period_returns_original() {
        let series = sawtooth_with_spike(60, 6, 30);
        let (report, remainder) =
            detect_anomalies_with_decomposition(&series, &DetectionConfig::new(3.0)).unwrap();
        assert_eq!(remainder, series);
        assert!(report.contains(30));
    }

    #[test]
    fn test_with_period_detects_on_remainder() {
        let series = sawtooth_with_spike(60, 6, 30);
        let config = DetectionConfig::new(3.0).with_period(6);
        let output = AnomalyPipeline::new(config).run(&series).unwrap();

        assert_eq!(output.remainder.len(), series.len());
        assert!(output.decomposition.is_some());
        assert_eq!(output.report.indices(), vec![30]);
    }

    #[test]
    fn test_parameter_errors_surface_first() {
        let series = TimeSeries::new(vec![1.0; 5]);
        let config = DetectionConfig::new(0.0).with_period(12);
        let result = detect_anomalies_with_decomposition(&series, &config);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_decomposition_errors_propagate() {
        let series = TimeSeries::new(vec![1.0; 23]);
        let config = DetectionConfig::new(3.0).with_period(12);
        let result = detect_anomalies_with_decomposition(&series, &config);
        assert!(matches!(
            result,
            Err(Error::InsufficientData { required: 24, actual: 23 })
        ));
    }

    #[test]
    fn test_custom_stl_params() {
        let series = sawtooth_with_spike(60, 6, 30);
        let pipeline = AnomalyPipeline::new(DetectionConfig::new(3.0).with_period(6)).with_stl_params(
            StlParams {
                seasonal_span: 4,
                ..Default::default()
            },
        );
        assert!(matches!(pipeline.run(&series), Err(Error::InvalidParameter(_))));
    }
}
