use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use loadcmp_core::config::{read_config, AnalysisConfig, EndpointSource};
use loadcmp_core::engine::{analyze_logs, analyze_summary_files};
use loadcmp_core::results::export::{
    export_aggregates_csv, export_csv, export_json, render_multi_run_table, render_table,
};
use loadcmp_core::LoadcmpError;
use tracing_subscriber::EnvFilter;

// =============================================================================
// CLI
// =============================================================================

#[derive(Parser)]
#[command(name = "loadcmp")]
#[command(version)]
#[command(about = "Compare k6 load-test results across endpoints")]
struct Cli {
    /// Log progress to stderr (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze k6 JSON event logs (`k6 run --out json=...`), one per endpoint
    Analyze {
        /// JSON config file listing endpoints, check name and thresholds
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Endpoint log as NAME=PATH; replaces the configured endpoints
        #[arg(short, long = "log", value_name = "NAME=PATH", value_parser = parse_named_path)]
        logs: Vec<(String, PathBuf)>,

        /// Write the full report as JSON
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,

        /// Write per-endpoint results as CSV
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
    /// Aggregate captured k6 text summaries across repeated runs
    Summarize {
        /// Captured stdout as NAME=PATH; repeat a name once per run
        #[arg(
            short,
            long = "run",
            value_name = "NAME=PATH",
            value_parser = parse_named_path,
            required = true
        )]
        runs: Vec<(String, PathBuf)>,

        /// JSON config file (only the latency thresholds are used)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Write the full report as JSON
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,

        /// Write per-endpoint aggregates as CSV
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
}

fn parse_named_path(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got '{s}'")),
    }
}

// =============================================================================
// Commands
// =============================================================================

async fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, LoadcmpError> {
    match path {
        Some(path) => read_config(path).await,
        None => Ok(AnalysisConfig::default()),
    }
}

async fn write_output(path: &Path, content: String) -> Result<(), LoadcmpError> {
    tokio::fs::write(path, content).await?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}

async fn run(cli: Cli) -> Result<(), LoadcmpError> {
    match cli.command {
        Command::Analyze {
            config,
            logs,
            json,
            csv,
        } => {
            let mut config = load_config(config.as_deref()).await?;
            if !logs.is_empty() {
                config.endpoints = logs
                    .into_iter()
                    .map(|(name, path)| EndpointSource::new(name, path))
                    .collect();
                config.ensure_valid()?;
            }

            let report = analyze_logs(&config).await;
            print!("{}", render_table(&report));

            if let Some(path) = json {
                write_output(&path, export_json(&report)?).await?;
            }
            if let Some(path) = csv {
                write_output(&path, export_csv(&report.results)?).await?;
            }
        }
        Command::Summarize {
            runs,
            config,
            json,
            csv,
        } => {
            let config = load_config(config.as_deref()).await?;
            let report = analyze_summary_files(&runs, &config.latency_thresholds).await;
            print!("{}", render_multi_run_table(&report));

            if let Some(path) = json {
                write_output(&path, export_json(&report)?).await?;
            }
            if let Some(path) = csv {
                write_output(&path, export_aggregates_csv(&report.aggregates)?).await?;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout carries the report; logs go to stderr.
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("loadcmp: {e}");
            ExitCode::FAILURE
        }
    }
}
