//! Scoring detections against known anomalies

use std::collections::BTreeSet;

use serde::Serialize;

use super::AnomalyReport;

/// Confusion counts of flagged indices versus ground truth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl Evaluation {
    /// Compare a report's flagged indices with the true anomaly indices
    pub fn new(report: &AnomalyReport, truth: &BTreeSet<usize>) -> Self {
        let flagged: BTreeSet<usize> = report.anomalies().keys().copied().collect();
        Self::from_sets(&flagged, truth)
    }

    pub fn from_sets(flagged: &BTreeSet<usize>, truth: &BTreeSet<usize>) -> Self {
        let true_positives = flagged.intersection(truth).count();
        Self {
            true_positives,
            false_positives: flagged.len() - true_positives,
            false_negatives: truth.len() - true_positives,
        }
    }

    /// TP / (TP + FP); 0 when nothing was flagged
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// TP / (TP + FN); 0 when there is nothing to find
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// Weighted harmonic mean of precision and recall.
    ///
    /// `beta > 1` favours recall, `beta < 1` favours precision. Returns 0
    /// when both precision and recall are 0.
    pub fn fbeta(&self, beta: f64) -> f64 {
        let p = self.precision();
        let r = self.recall();
        let b2 = beta * beta;
        let denom = b2 * p + r;
        if denom <= 0.0 {
            0.0
        } else {
            (1.0 + b2) * p * r / denom
        }
    }

    pub fn f1(&self) -> f64 {
        self.fbeta(1.0)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// F-beta score of a report against the true anomaly indices
pub fn fbeta_score(report: &AnomalyReport, truth: &BTreeSet<usize>, beta: f64) -> f64 {
    Evaluation::new(report, truth).fbeta(beta)
}
