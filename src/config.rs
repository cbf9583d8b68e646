//! Configuration management
//!
//! A TOML file with one section per concern. Every section has defaults,
//! so a partial file (or none at all) is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::anomaly::DetectionConfig;
use crate::data::DataConfig;
use crate::decomposition::StlParams;
use crate::error::Result;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub detection: DetectionConfig,
    pub decomposition: StlParams,
    pub data: DataConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from file or use default
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Create default configuration file
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        AppConfig::default().save(path)
    }

    /// Check the detection and decomposition sections
    pub fn validate(&self) -> Result<()> {
        self.detection.validate()?;
        if let Some(period) = self.detection.period {
            self.decomposition.spans(period)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.detection.tolerance, 4.0);
        assert_eq!(config.decomposition.seasonal_span, 7);
        assert_eq!(config.data.value_column, "volt");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file() {
        let config: AppConfig = toml::from_str(
            r#"
            [detection]
            tolerance = 3.0
            period = 24

            [data]
            value_column = "vibration"
            filter_column = "machineID"
            filter_value = "17"
            "#,
        )
        .unwrap();

        assert_eq!(config.detection.period, Some(24));
        assert_eq!(config.data.value_column, "vibration");
        assert_eq!(config.data.timestamp_column.as_deref(), Some("datetime"));
        assert_eq!(config.decomposition, StlParams::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anomaly.toml");

        let mut config = AppConfig::default();
        config.detection = DetectionConfig::new(2.5).with_window(48).with_period(168);
        config.save(&path).unwrap();

        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(dir.path().join("missing.toml"));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[detection]\nwindow = -3\n").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_even_span() {
        let mut config = AppConfig::default();
        config.detection.period = Some(12);
        config.decomposition.seasonal_span = 6;
        assert!(config.validate().is_err());
    }
}
