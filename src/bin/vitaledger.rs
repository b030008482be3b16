//! Vitaledger CLI - Command-line interface for the daily metrics engine
//!
//! Commands:
//! - run: Derive daily records from a recorded capture over a date range
//! - validate: Validate a capture file and report its contents

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vitaledger::engine::DailyMetricsEngine;
use vitaledger::replay::{Capture, ReplaySource};
use vitaledger::sink::{JsonFileSink, MetricsSink};
use vitaledger::types::DailyMetricsRecord;
use vitaledger::{EngineConfig, ENGINE_VERSION};

/// Vitaledger - Daily health metrics derivation engine
#[derive(Parser)]
#[command(name = "vitaledger")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Derive reconciled daily health records from wearable data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive daily records from a capture over a date range
    Run {
        /// Capture file with recorded raw data
        #[arg(short, long)]
        capture: PathBuf,

        /// First date to derive (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last date to derive, inclusive; defaults to the first
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Engine configuration file (JSON); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Upsert records into this JSON file instead of printing them
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output format when printing to stdout
        #[arg(long, default_value = "json-pretty")]
        format: OutputFormat,
    },

    /// Validate a capture file and report its contents
    Validate {
        /// Capture file to check
        #[arg(short, long)]
        capture: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            capture,
            from,
            to,
            config,
            out,
            format,
        } => cmd_run(&capture, from, to.unwrap_or(from), config.as_deref(), out, format),
        Commands::Validate { capture } => cmd_validate(&capture),
    }
}

fn cmd_run(
    capture_path: &Path,
    from: NaiveDate,
    to: NaiveDate,
    config_path: Option<&Path>,
    out: Option<PathBuf>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    if to < from {
        bail!("end date {to} precedes start date {from}");
    }

    let config = match config_path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("cannot read config {}", path.display()))?;
            EngineConfig::from_json(&raw)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    let source = load_replay(capture_path, &config)?;
    let engine = DailyMetricsEngine::with_config(source, config);
    let mut sink = out.map(JsonFileSink::new);

    let mut records: Vec<DailyMetricsRecord> = Vec::new();
    let mut failed_days = 0usize;

    let mut date = from;
    while date <= to {
        match engine.compute_day(date) {
            Ok(record) => {
                info!(date = %date, steps = record.steps, "day derived");
                match &mut sink {
                    Some(sink) => {
                        if let Err(e) = sink.upsert(&record) {
                            warn!(date = %date, error = %e, "record not persisted");
                            failed_days += 1;
                        }
                    }
                    None => records.push(record),
                }
            }
            Err(e) => {
                error!(date = %date, error = %e, "day skipped");
                failed_days += 1;
            }
        }
        date = date
            .succ_opt()
            .with_context(|| format!("date range overflow after {date}"))?;
    }

    if sink.is_none() {
        match format {
            OutputFormat::Ndjson => {
                for record in &records {
                    println!("{}", serde_json::to_string(record)?);
                }
            }
            OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(&records)?),
        }
    }

    if failed_days > 0 {
        bail!("{failed_days} day(s) failed");
    }
    Ok(())
}

fn cmd_validate(capture_path: &Path) -> anyhow::Result<()> {
    let raw = fs::read_to_string(capture_path)
        .with_context(|| format!("cannot read capture {}", capture_path.display()))?;
    let capture: Capture = serde_json::from_str(&raw)
        .with_context(|| format!("invalid capture {}", capture_path.display()))?;

    let total_points: usize = capture.series.iter().map(|s| s.points.len()).sum();

    println!("Capture Report");
    println!("==============");
    println!("Series:       {}", capture.series.len());
    println!("Points:       {}", total_points);
    println!("Sessions:     {}", capture.sessions.len());
    println!("Step sources: {}", capture.step_sources.len());
    for series in &capture.series {
        println!(
            "  - {:<20} {:>6} points{}",
            format!("{}:", series.kind.as_str()),
            series.points.len(),
            series
                .source_id
                .as_deref()
                .map(|id| format!("  ({id})"))
                .unwrap_or_default()
        );
    }

    if capture.series.is_empty() && capture.sessions.is_empty() {
        bail!("capture holds no data");
    }
    Ok(())
}

fn load_replay(path: &Path, config: &EngineConfig) -> anyhow::Result<ReplaySource> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("cannot read capture {}", path.display()))?;
    ReplaySource::from_json(&raw, config.timezone)
        .with_context(|| format!("invalid capture {}", path.display()))
}
