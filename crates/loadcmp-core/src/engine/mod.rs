use std::path::{Path, PathBuf};

use crate::classify::LatencyThresholds;
use crate::config::AnalysisConfig;
use crate::results::{MultiRunReport, Report, RunResult};
use crate::summary::parse_summary;

pub mod aggregator;

pub use aggregator::{parse_log, RunAccumulator, DEFAULT_CHECK_NAME};

/// Read and parse one endpoint's structured log.
///
/// A missing or unreadable file yields [`RunResult::unavailable`] instead of
/// an error.
pub async fn analyze_log_file(
    endpoint: &str,
    path: impl AsRef<Path>,
    check_name: &str,
) -> RunResult {
    let path = path.as_ref();
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let content = String::from_utf8_lossy(&bytes);
            let result = parse_log(endpoint, check_name, &content);
            tracing::info!(
                "{endpoint}: {} requests, {} errors, status {}",
                result.requests,
                result.errors,
                result.status
            );
            result
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("{endpoint}: no log at {}", path.display());
            RunResult::unavailable(endpoint)
        }
        Err(e) => {
            tracing::warn!("{endpoint}: failed to read {}: {e}", path.display());
            RunResult::unavailable(endpoint)
        }
    }
}

/// Analyze every configured endpoint's log and build a single-run report.
pub async fn analyze_logs(config: &AnalysisConfig) -> Report {
    let mut results = Vec::with_capacity(config.endpoints.len());
    for endpoint in &config.endpoints {
        let result =
            analyze_log_file(&endpoint.name, &endpoint.log_path, &config.check_name).await;
        results.push(result);
    }
    Report::new(results)
}

/// Read and parse one captured text summary.
///
/// Missing or unreadable files yield [`RunResult::unavailable`].
pub async fn analyze_summary_file(
    endpoint: &str,
    path: impl AsRef<Path>,
    thresholds: &LatencyThresholds,
) -> RunResult {
    let path = path.as_ref();
    match tokio::fs::read(path).await {
        Ok(bytes) => parse_summary(endpoint, &String::from_utf8_lossy(&bytes), thresholds),
        Err(e) => {
            tracing::warn!("{endpoint}: failed to read {}: {e}", path.display());
            RunResult::unavailable(endpoint)
        }
    }
}

/// Arrange `(endpoint, result)` pairs into runs.
///
/// The n-th result seen for an endpoint belongs to run n. Endpoints with
/// fewer results than others are simply absent from the later runs.
pub fn arrange_runs<I>(results: I) -> Vec<Vec<RunResult>>
where
    I: IntoIterator<Item = RunResult>,
{
    let mut runs: Vec<Vec<RunResult>> = Vec::new();
    for result in results {
        let index = runs
            .iter()
            .position(|run| !run.iter().any(|r| r.endpoint == result.endpoint))
            .unwrap_or(runs.len());
        if index == runs.len() {
            runs.push(Vec::new());
        }
        runs[index].push(result);
    }
    runs
}

/// Parse captured text summaries and aggregate them across runs.
///
/// Inputs are `(endpoint, path)` pairs; repeating an endpoint adds another
/// run for it.
pub async fn analyze_summary_files(
    inputs: &[(String, PathBuf)],
    thresholds: &LatencyThresholds,
) -> MultiRunReport {
    let mut results = Vec::with_capacity(inputs.len());
    for (endpoint, path) in inputs {
        results.push(analyze_summary_file(endpoint, path, thresholds).await);
    }
    MultiRunReport::new(arrange_runs(results), thresholds)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
