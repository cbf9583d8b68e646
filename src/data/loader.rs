//! CSV telemetry loading
//!
//! Reads one sensor channel out of a headered CSV file, e.g. the hourly
//! `datetime,machineID,volt,rotate,pressure,vibration` telemetry layout,
//! optionally restricted to a single machine.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::TimeSeries;
use crate::error::{Error, Result};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
];

/// Which columns to read and how
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    /// Timestamp column; `None` keeps file order with implicit spacing
    pub timestamp_column: Option<String>,
    /// Column holding the readings
    pub value_column: String,
    /// Keep only rows whose `filter_column` equals `filter_value`
    pub filter_column: Option<String>,
    pub filter_value: Option<String>,
    /// Optional 0/1 ground-truth column
    pub label_column: Option<String>,
    /// chrono format string tried before the built-in formats
    pub timestamp_format: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            timestamp_column: Some("datetime".to_string()),
            value_column: "volt".to_string(),
            filter_column: None,
            filter_value: None,
            label_column: None,
            timestamp_format: None,
        }
    }
}

/// A loaded channel plus its ground truth, if the file had labels
#[derive(Debug, Clone)]
pub struct Telemetry {
    pub series: TimeSeries,
    pub labels: Option<BTreeSet<usize>>,
}

/// Load a channel from a CSV file
pub fn load_csv<P: AsRef<Path>>(path: P, config: &DataConfig) -> Result<Telemetry> {
    let path = path.as_ref();
    debug!(path = %path.display(), column = %config.value_column, "Loading telemetry");
    let file = File::open(path)?;
    read_csv(file, config)
}

/// Load a channel from any CSV reader
pub fn read_csv<R: Read>(reader: R, config: &DataConfig) -> Result<Telemetry> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::Parse(format!("column '{}' not found", name)))
    };

    let value_idx = column(&config.value_column)?;
    let ts_idx = config.timestamp_column.as_deref().map(|c| column(c)).transpose()?;
    let label_idx = config.label_column.as_deref().map(|c| column(c)).transpose()?;
    let filter = match (&config.filter_column, &config.filter_value) {
        (Some(col), Some(value)) => Some((column(col)?, value.as_str())),
        (None, None) => None,
        _ => {
            return Err(Error::invalid_parameter(
                "filter_column and filter_value must be given together",
            ))
        }
    };

    let mut rows: Vec<(Option<DateTime<Utc>>, f64, bool)> = Vec::new();

    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        // header is line 1
        let line = line + 2;

        if let Some((idx, wanted)) = filter {
            if record.get(idx) != Some(wanted) {
                continue;
            }
        }

        let value = parse_value(record.get(value_idx).unwrap_or(""), line)?;
        let timestamp = match ts_idx {
            Some(idx) => Some(parse_timestamp(
                record.get(idx).unwrap_or(""),
                config.timestamp_format.as_deref(),
                line,
            )?),
            None => None,
        };
        let label = match label_idx {
            Some(idx) => parse_label(record.get(idx).unwrap_or(""), line)?,
            None => false,
        };

        rows.push((timestamp, value, label));
    }

    if ts_idx.is_some() {
        rows.sort_by_key(|(ts, _, _)| *ts);
    }

    let labels = label_idx.map(|_| {
        rows.iter()
            .enumerate()
            .filter_map(|(i, (_, _, label))| if *label { Some(i) } else { None })
            .collect::<BTreeSet<usize>>()
    });

    let values: Vec<f64> = rows.iter().map(|(_, v, _)| *v).collect();
    let series = if ts_idx.is_some() {
        let timestamps = rows.iter().filter_map(|(ts, _, _)| *ts).collect();
        TimeSeries::with_timestamps(values, timestamps)?
    } else {
        TimeSeries::new(values)
    };

    let missing = series.nan_count();
    if missing > 0 {
        warn!(missing, "Telemetry contains missing readings; they propagate as NaN");
    }
    debug!(rows = series.len(), "Telemetry loaded");

    Ok(Telemetry { series, labels })
}

/// Empty fields are missing readings and load as NaN
fn parse_value(field: &str, line: usize) -> Result<f64> {
    if field.is_empty() {
        return Ok(f64::NAN);
    }
    field
        .parse::<f64>()
        .map_err(|_| Error::Parse(format!("line {}: invalid reading '{}'", line, field)))
}

fn parse_label(field: &str, line: usize) -> Result<bool> {
    match field.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => Err(Error::Parse(format!("line {}: invalid label '{}'", line, other))),
    }
}

/// Parse a timestamp as RFC 3339, the custom format, or one of the
/// common naive layouts (interpreted as UTC).
pub fn parse_timestamp(field: &str, custom: Option<&str>, line: usize) -> Result<DateTime<Utc>> {
    if let Some(fmt) = custom {
        if let Ok(dt) = NaiveDateTime::parse_from_str(field, fmt) {
            return Ok(dt.and_utc());
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(field) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(field, fmt) {
            return Ok(dt.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(field, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }

    Err(Error::Parse(format!(
        "line {}: unrecognised timestamp '{}'",
        line, field
    )))
}
