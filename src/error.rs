//! Error types for the telemetry anomaly library

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library
///
/// The decomposition and detection stages share this taxonomy, so the
/// pipeline hands their errors back untouched.
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value violates its constraint
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Series too short for the requested period or window
    #[error("Insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Malformed series (timestamp/value mismatch, non-increasing timestamps)
    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    /// Unparseable field in an input file
    #[error("Failed to parse data: {0}")]
    Parse(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration file could not be decoded
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration could not be encoded
    #[error("Failed to write configuration: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::InvalidParameter`]
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    /// Shorthand for [`Error::InsufficientData`]
    pub fn insufficient_data(required: usize, actual: usize) -> Self {
        Error::InsufficientData { required, actual }
    }

    /// True for errors caused by caller-supplied parameters or data,
    /// as opposed to file or encoding problems.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidParameter(_) | Error::InsufficientData { .. } | Error::InvalidSeries(_)
        )
    }
}
