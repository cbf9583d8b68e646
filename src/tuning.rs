//! Local parameter sweep
//!
//! Runs the pipeline for every combination in a grid of tolerances,
//! windows and periods against one labelled series, scoring each run by
//! F-beta. Runs are independent and evaluated in parallel.

use std::collections::BTreeSet;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::anomaly::{DetectionConfig, Evaluation};
use crate::data::TimeSeries;
use crate::decomposition::StlParams;
use crate::error::{Error, Result};
use crate::pipeline::AnomalyPipeline;

/// Candidate values for each parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGrid {
    pub tolerances: Vec<f64>,
    pub windows: Vec<Option<usize>>,
    pub periods: Vec<Option<usize>>,
}

impl ParameterGrid {
    /// Grid over tolerances only: global statistics, no decomposition
    pub fn new(tolerances: Vec<f64>) -> Self {
        Self {
            tolerances,
            windows: vec![None],
            periods: vec![None],
        }
    }

    pub fn with_windows(mut self, windows: Vec<Option<usize>>) -> Self {
        self.windows = windows;
        self
    }

    pub fn with_periods(mut self, periods: Vec<Option<usize>>) -> Self {
        self.periods = periods;
        self
    }

    /// Every combination, periods outermost
    pub fn configs(&self) -> Vec<DetectionConfig> {
        let mut configs = Vec::with_capacity(self.len());
        for &period in &self.periods {
            for &window in &self.windows {
                for &tolerance in &self.tolerances {
                    configs.push(DetectionConfig {
                        tolerance,
                        window,
                        period,
                    });
                }
            }
        }
        configs
    }

    pub fn len(&self) -> usize {
        self.tolerances.len() * self.windows.len() * self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Score of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct TrialScore {
    pub evaluation: Evaluation,
    pub fbeta: f64,
    pub flagged: usize,
}

/// One grid point and how it fared
#[derive(Debug)]
pub struct Trial {
    pub config: DetectionConfig,
    pub outcome: Result<TrialScore>,
}

impl Trial {
    pub fn score(&self) -> Option<f64> {
        self.outcome.as_ref().ok().map(|s| s.fbeta)
    }
}

/// Parameter sweep over one labelled series
#[derive(Debug, Clone)]
pub struct Sweep {
    grid: ParameterGrid,
    beta: f64,
    stl: StlParams,
}

impl Sweep {
    pub fn new(grid: ParameterGrid) -> Self {
        Self {
            grid,
            beta: 1.0,
            stl: StlParams::default(),
        }
    }

    /// Weight of recall relative to precision in the score
    pub fn beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    pub fn stl_params(mut self, params: StlParams) -> Self {
        self.stl = params;
        self
    }

    /// Run every grid point; results are ordered best score first, failed
    /// runs last. A failing grid point does not stop the others.
    pub fn run(&self, series: &TimeSeries, truth: &BTreeSet<usize>) -> Result<Vec<Trial>> {
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err(Error::invalid_parameter(format!(
                "beta must be a positive number, got {}",
                self.beta
            )));
        }
        if self.grid.is_empty() {
            return Err(Error::invalid_parameter("parameter grid is empty"));
        }

        info!(runs = self.grid.len(), beta = self.beta, "Starting parameter sweep");

        let mut trials: Vec<Trial> = self
            .grid
            .configs()
            .into_par_iter()
            .map(|config| {
                let outcome = AnomalyPipeline::new(config.clone())
                    .with_stl_params(self.stl.clone())
                    .run(series)
                    .map(|output| {
                        let evaluation = Evaluation::new(&output.report, truth);
                        TrialScore {
                            fbeta: evaluation.fbeta(self.beta),
                            flagged: output.report.count(),
                            evaluation,
                        }
                    });
                if let Err(e) = &outcome {
                    debug!(?config, error = %e, "Grid point failed");
                }
                Trial { config, outcome }
            })
            .collect();

        // stable: equal scores keep grid order
        trials.sort_by(|a, b| match (a.score(), b.score()) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        if let Some(best) = trials.first() {
            info!(config = ?best.config, score = ?best.score(), "Sweep finished");
        }

        Ok(trials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labelled() -> (TimeSeries, BTreeSet<usize>) {
        let values: Vec<f64> = (0..120)
            .map(|i| match i {
                40 => 12.0,
                90 => 6.0,
                _ => ((i * 37) % 11) as f64 / 11.0,
            })
            .collect();
        (TimeSeries::new(values), [40, 90].into_iter().collect())
    }

    #[test]
    fn test_grid_configs() {
        let grid = ParameterGrid::new(vec![2.0, 3.0])
            .with_windows(vec![None, Some(10)])
            .with_periods(vec![None, Some(12), Some(24)]);
        let configs = grid.configs();
        assert_eq!(configs.len(), 12);
        assert_eq!(grid.len(), 12);
        assert_eq!(configs[0], DetectionConfig::new(2.0));
        assert_eq!(configs[11], DetectionConfig::new(3.0).with_window(10).with_period(24));
    }

    #[test]
    fn test_sweep_ranks_best_first() {
        let (series, truth) = labelled();
        let grid = ParameterGrid::new(vec![0.2, 3.0, 10.0]);
        let trials = Sweep::new(grid).run(&series, &truth).unwrap();

        assert_eq!(trials.len(), 3);
        let scores: Vec<f64> = trials.iter().filter_map(|t| t.score()).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(trials[0].config.tolerance, 3.0);
    }

    #[test]
    fn test_failed_points_sort_last() {
        let (series, truth) = labelled();
        let grid = ParameterGrid::new(vec![3.0]).with_periods(vec![Some(100), None]);
        let trials = Sweep::new(grid).run(&series, &truth).unwrap();

        assert!(trials[0].outcome.is_ok());
        assert!(matches!(
            trials[1].outcome,
            Err(Error::InsufficientData { required: 200, actual: 120 })
        ));
    }

    #[test]
    fn test_invalid_sweep() {
        let (series, truth) = labelled();
        let empty = Sweep::new(ParameterGrid::new(vec![]));
        assert!(empty.run(&series, &truth).is_err());

        let bad_beta = Sweep::new(ParameterGrid::new(vec![3.0])).beta(0.0);
        assert!(bad_beta.run(&series, &truth).is_err());
    }
}
