//! Sweep detection parameters against labelled data
//!
//! Usage:
//!   cargo run --bin tune_parameters -- --input telemetry.csv --label-column failure \
//!       --tolerances 2,3,4,5 --windows none,24,168 --periods none,24
//!   cargo run --bin tune_parameters -- --synthetic

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rust_telemetry_anomaly::{load_csv, AppConfig, ParameterGrid, Sweep, SyntheticSeries, Trial};

#[derive(Parser, Debug)]
#[command(author, version, about = "Rank detection parameters by F-beta on labelled data")]
struct Args {
    /// CSV file with telemetry and a 0/1 label column
    #[arg(short, long, conflicts_with = "synthetic")]
    input: Option<PathBuf>,

    /// Use a generated series with known spikes
    #[arg(long)]
    synthetic: bool,

    /// TOML configuration file (data and decomposition sections)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Column with the readings
    #[arg(long)]
    value_column: Option<String>,

    /// 0/1 ground-truth column
    #[arg(long)]
    label_column: Option<String>,

    /// Comma-separated tolerances
    #[arg(long, value_delimiter = ',', default_value = "2,3,4,5")]
    tolerances: Vec<f64>,

    /// Comma-separated windows; "none" means whole-series statistics
    #[arg(long, value_delimiter = ',', default_value = "none")]
    windows: Vec<String>,

    /// Comma-separated periods; "none" means no decomposition
    #[arg(long, value_delimiter = ',', default_value = "none,24,168")]
    periods: Vec<String>,

    /// Beta of the F-beta score
    #[arg(long, default_value_t = 1.0)]
    beta: f64,

    /// Seed of the synthetic series
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Show the N best grid points
    #[arg(long, default_value_t = 10)]
    top: usize,
}

fn parse_optional(values: &[String]) -> Result<Vec<Option<usize>>> {
    values
        .iter()
        .map(|s| match s.trim() {
            "none" | "" => Ok(None),
            n => n
                .parse::<usize>()
                .map(Some)
                .with_context(|| format!("expected a positive integer or \"none\", got {:?}", n)),
        })
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(col) = &args.value_column {
        config.data.value_column = col.clone();
    }
    if args.label_column.is_some() {
        config.data.label_column = args.label_column.clone();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    let (series, truth) = if args.synthetic {
        info!(seed = args.seed, "Generating synthetic series");
        let labeled = SyntheticSeries::new(2000)
            .seed(args.seed)
            .trend(0.001)
            .seasonal(3.0, 24)
            .spike(300, 6.0)
            .spike(1100, 5.5)
            .spike(1750, 7.0)
            .generate()?;
        (labeled.series, labeled.anomalies)
    } else {
        let Some(path) = &args.input else {
            bail!("either --input or --synthetic is required");
        };
        let telemetry = load_csv(path, &config.data)
            .with_context(|| format!("loading telemetry from {}", path.display()))?;
        let Some(labels) = telemetry.labels else {
            bail!("a label column is required to score parameters (--label-column)");
        };
        (telemetry.series, labels)
    };

    println!("{}", "Parameter Sweep".bold());
    println!("===============");
    println!("Samples:            {}", series.len());
    println!("Labelled anomalies: {}", truth.len());

    let grid = ParameterGrid::new(args.tolerances.clone())
        .with_windows(parse_optional(&args.windows)?)
        .with_periods(parse_optional(&args.periods)?);
    println!("Grid points:        {}", grid.len());

    let trials = Sweep::new(grid)
        .beta(args.beta)
        .stl_params(config.decomposition.clone())
        .run(&series, &truth)?;

    print_ranking(&trials, args.beta, args.top);

    Ok(())
}

fn describe(value: Option<usize>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_ranking(trials: &[Trial], beta: f64, top: usize) {
    println!();
    println!(
        "{:>4} {:>9} {:>7} {:>7} {:>8} {:>10} {:>7} {:>8}",
        "Rank", "Tolerance", "Window", "Period", "Flagged", "Precision", "Recall", format!("F{}", beta)
    );
    println!("{}", "-".repeat(68));

    for (rank, trial) in trials.iter().take(top).enumerate() {
        let config = &trial.config;
        match &trial.outcome {
            Ok(score) => {
                let line = format!(
                    "{:>4} {:>9.2} {:>7} {:>7} {:>8} {:>10.3} {:>7.3} {:>8.3}",
                    rank + 1,
                    config.tolerance,
                    describe(config.window),
                    describe(config.period),
                    score.flagged,
                    score.evaluation.precision(),
                    score.evaluation.recall(),
                    score.fbeta
                );
                if rank == 0 {
                    println!("{}", line.green());
                } else {
                    println!("{}", line);
                }
            }
            Err(e) => {
                let line = format!(
                    "{:>4} {:>9.2} {:>7} {:>7}  {}",
                    rank + 1,
                    config.tolerance,
                    describe(config.window),
                    describe(config.period),
                    e
                );
                println!("{}", line.yellow());
            }
        }
    }

    let failed = trials.iter().filter(|t| t.outcome.is_err()).count();
    if failed > 0 {
        println!("\n{} grid point(s) failed", failed);
    }
}
