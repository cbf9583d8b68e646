//! Detect anomalies in sensor telemetry
//!
//! Usage:
//!   cargo run --bin detect_anomalies -- --input telemetry.csv --value-column volt \
//!       --filter-column machineID --filter-value 1 --period 24 --tolerance 4
//!   cargo run --bin detect_anomalies -- --synthetic --period 168

use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rust_telemetry_anomaly::{
    load_csv, AnomalyPipeline, AppConfig, DetectionConfig, Evaluation, PipelineOutput,
    SyntheticSeries, Threshold, TimeSeries,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Detect anomalies in sensor telemetry")]
struct Args {
    /// CSV file with telemetry
    #[arg(short, long, conflicts_with = "synthetic")]
    input: Option<PathBuf>,

    /// Use a generated series (noise + weekly cycle + one spike) instead of a file
    #[arg(long)]
    synthetic: bool,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Column with the readings
    #[arg(long)]
    value_column: Option<String>,

    /// Column with the timestamps
    #[arg(long)]
    timestamp_column: Option<String>,

    /// Keep only rows where this column...
    #[arg(long, requires = "filter_value")]
    filter_column: Option<String>,

    /// ...equals this value
    #[arg(long, requires = "filter_column")]
    filter_value: Option<String>,

    /// 0/1 ground-truth column used for scoring
    #[arg(long)]
    label_column: Option<String>,

    /// Standard deviations above the mean that count as anomalous
    #[arg(short, long)]
    tolerance: Option<f64>,

    /// Rolling window size (omit for whole-series statistics)
    #[arg(short, long)]
    window: Option<usize>,

    /// Seasonal period in samples (omit to skip decomposition)
    #[arg(short, long)]
    period: Option<usize>,

    /// Beta of the F-beta score
    #[arg(long, default_value_t = 1.0)]
    beta: f64,

    /// Length of the synthetic series
    #[arg(long, default_value_t = 1000)]
    length: usize,

    /// Seed of the synthetic series
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Show at most N anomalies
    #[arg(long, default_value_t = 20)]
    top: usize,

    /// Write the report as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    config: &'a DetectionConfig,
    #[serde(flatten)]
    output: &'a PipelineOutput,
    evaluation: Option<Evaluation>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => AppConfig::default(),
    };
    apply_overrides(&mut config, &args);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    config.validate()?;

    let (series, labels) = if args.synthetic {
        let period = config.detection.period.unwrap_or(168);
        let spike = args.length / 2;
        info!(length = args.length, period, spike, "Generating synthetic series");
        let labeled = SyntheticSeries::new(args.length)
            .seed(args.seed)
            .seasonal(1.5, period)
            .spike(spike, 5.0)
            .generate()?;
        (labeled.series, Some(labeled.anomalies))
    } else {
        let Some(path) = &args.input else {
            bail!("either --input or --synthetic is required");
        };
        let telemetry = load_csv(path, &config.data)
            .with_context(|| format!("loading telemetry from {}", path.display()))?;
        (telemetry.series, telemetry.labels)
    };

    println!("{}", "Anomaly Detection".bold());
    println!("=================");
    println!("Samples:   {}", series.len());
    println!("Tolerance: {:.2}", config.detection.tolerance);
    match config.detection.window {
        Some(w) => println!("Window:    {}", w),
        None => println!("Window:    whole series"),
    }
    match config.detection.period {
        Some(p) => println!("Period:    {} (STL decomposition)", p),
        None => println!("Period:    none (raw series)"),
    }

    let output = AnomalyPipeline::new(config.detection.clone())
        .with_stl_params(config.decomposition.clone())
        .run(&series)?;

    print_summary(&output);
    print_anomalies(&series, &output, args.top);

    let evaluation = labels.as_ref().map(|truth| Evaluation::new(&output.report, truth));
    if let (Some(eval), Some(truth)) = (&evaluation, &labels) {
        print_evaluation(eval, truth, args.beta);
    }

    if let Some(path) = &args.output {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let report = JsonReport {
            config: &config.detection,
            output: &output,
            evaluation,
        };
        serde_json::to_writer_pretty(BufWriter::new(file), &report)?;
        info!(path = %path.display(), "Report written");
    }

    Ok(())
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(t) = args.tolerance {
        config.detection.tolerance = t;
    }
    if args.window.is_some() {
        config.detection.window = args.window;
    }
    if args.period.is_some() {
        config.detection.period = args.period;
    }
    if let Some(col) = &args.value_column {
        config.data.value_column = col.clone();
    }
    if let Some(col) = &args.timestamp_column {
        config.data.timestamp_column = Some(col.clone());
    }
    if args.filter_column.is_some() {
        config.data.filter_column = args.filter_column.clone();
        config.data.filter_value = args.filter_value.clone();
    }
    if args.label_column.is_some() {
        config.data.label_column = args.label_column.clone();
    }
}

fn print_summary(output: &PipelineOutput) {
    let report = &output.report;

    println!("\nResults:");
    println!("  Anomalies:    {}", report.count());
    println!("  Anomaly rate: {:.3}%", report.anomaly_rate() * 100.0);
    match report.threshold() {
        Threshold::Global(t) => println!("  Threshold:    {:.4}", t),
        Threshold::Rolling(ts) => {
            let defined = ts.iter().filter(|t| !t.is_nan()).count();
            println!("  Threshold:    rolling ({} of {} defined)", defined, ts.len());
        }
    }
    if let Some(d) = &output.decomposition {
        println!("  Trend strength:    {:.3}", d.trend_strength());
        println!("  Seasonal strength: {:.3}", d.seasonal_strength());
    }
}

fn print_anomalies(series: &TimeSeries, output: &PipelineOutput, top: usize) {
    let report = &output.report;
    if report.is_empty() {
        println!("\n  {}", "No anomalies detected".green());
        return;
    }

    println!("\nAnomalies:");
    println!(
        "{:>7} {:>20} {:>12} {:>12} {:>12}",
        "Index", "Time", "Reading", "Examined", "Threshold"
    );
    println!("{}", "-".repeat(67));

    for (&i, &value) in report.anomalies().iter().take(top) {
        let time = series
            .timestamp_at(i)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let line = format!(
            "{:>7} {:>20} {:>12.4} {:>12.4} {:>12.4}",
            i,
            time,
            series.values()[i],
            value,
            report.threshold().at(i)
        );
        println!("{}", line.red());
    }

    if report.count() > top {
        println!("  ... and {} more", report.count() - top);
    }
}

fn print_evaluation(eval: &Evaluation, truth: &BTreeSet<usize>, beta: f64) {
    println!("\nAgainst {} labelled anomalies:", truth.len());
    println!("  Precision: {:.3}", eval.precision());
    println!("  Recall:    {:.3}", eval.recall());
    println!("  F{}:        {:.3}", beta, eval.fbeta(beta));
}
