//! Anomaly Detection for Sensor Telemetry
//!
//! Seasonal-trend decomposition (STL) followed by mean/standard-deviation
//! threshold detection on the remainder. Removing the daily or weekly cycle
//! first lets a spike that hides inside the normal swing of the signal
//! stand out.
//!
//! # Modules
//!
//! - `data`: the `TimeSeries` type, rolling statistics, CSV loading and
//!   synthetic series
//! - `decomposition`: STL decomposition into trend, seasonal and remainder
//! - `anomaly`: threshold detection and F-beta evaluation
//! - `pipeline`: decomposition followed by detection
//! - `tuning`: parallel parameter sweep against labelled data
//! - `config`: TOML configuration
//!
//! # Example
//!
//! ```
//! use rust_telemetry_anomaly::{detect_anomalies_with_decomposition, DetectionConfig, TimeSeries};
//!
//! let values: Vec<f64> = (0..96)
//!     .map(|i| if i == 50 { 40.0 } else { (i % 24) as f64 })
//!     .collect();
//! let series = TimeSeries::new(values);
//!
//! let config = DetectionConfig::new(3.0).with_period(24);
//! let (report, remainder) = detect_anomalies_with_decomposition(&series, &config)?;
//!
//! assert!(report.contains(50));
//! assert_eq!(remainder.len(), series.len());
//! # Ok::<(), rust_telemetry_anomaly::Error>(())
//! ```

pub mod anomaly;
pub mod config;
pub mod data;
pub mod decomposition;
pub mod error;
pub mod pipeline;
pub mod tuning;

pub use anomaly::{
    detect, fbeta_score, AnomalyDetector, AnomalyReport, DetectionConfig, Evaluation, Threshold,
    ThresholdDetector,
};
pub use config::{AppConfig, LoggingConfig};
pub use data::{load_csv, DataConfig, LabeledSeries, SyntheticSeries, Telemetry, TimeSeries};
pub use decomposition::{decompose, Decomposer, DecompositionResult, StlParams};
pub use error::{Error, Result};
pub use pipeline::{detect_anomalies_with_decomposition, AnomalyPipeline, PipelineOutput};
pub use tuning::{ParameterGrid, Sweep, Trial, TrialScore};
