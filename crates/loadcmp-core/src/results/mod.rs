pub mod export;
pub mod ranking;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classify::{classify, LatencyThresholds, Status};
use crate::stats::{max_defined, mean_defined, min_defined, percent_of};

pub use ranking::{rank, Ranked, RankedEndpoint, Ranking};

// ---------------------------------------------------------------------------
// RunResult - one endpoint, one test invocation
// ---------------------------------------------------------------------------

/// Statistics for one endpoint from one test invocation.
///
/// `None` in any optional field means the value was not measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunResult {
    pub endpoint: String,
    /// Total requests sent. Always `>= errors`.
    pub requests: u64,
    /// Failed requests.
    pub errors: u64,
    /// Whether `errors` came from a real failure signal rather than a default.
    pub errors_observed: bool,
    /// Check pass ratio in percent. Independent of `errors`.
    pub success_rate_percent: Option<f64>,
    pub avg_ms: Option<f64>,
    pub min_ms: Option<f64>,
    pub max_ms: Option<f64>,
    pub p90_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub status: Status,
}

impl RunResult {
    /// A result for an endpoint whose input was missing or unreadable.
    pub fn unavailable(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            requests: 0,
            errors: 0,
            errors_observed: false,
            success_rate_percent: None,
            avg_ms: None,
            min_ms: None,
            max_ms: None,
            p90_ms: None,
            p95_ms: None,
            p99_ms: None,
            status: Status::Unavailable,
        }
    }

    /// Failed-request share in percent, `None` when nothing was sent.
    pub fn error_rate_percent(&self) -> Option<f64> {
        percent_of(self.errors as f64, self.requests as f64)
    }
}

// ---------------------------------------------------------------------------
// AggregateResult - one endpoint across N runs
// ---------------------------------------------------------------------------

/// Statistics for one endpoint consolidated across several runs.
///
/// Latency fields are the mean of per-run values except `min_ms` and
/// `max_ms`, which are the fastest and slowest values seen in any run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AggregateResult {
    pub endpoint: String,
    /// Number of runs with available input that contributed to this aggregate.
    pub runs: usize,
    pub total_requests: u64,
    pub total_errors: u64,
    pub mean_requests: Option<f64>,
    pub success_rate_percent: Option<f64>,
    pub avg_ms: Option<f64>,
    pub min_ms: Option<f64>,
    pub max_ms: Option<f64>,
    pub p90_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub status: Status,
}

/// Fold the runs of a single endpoint into one [`AggregateResult`].
///
/// Runs whose input was unavailable do not contribute at all. Each field
/// only averages the contributing runs that reported it. The status is
/// error-based on the runs that carried a failure signal whenever there is
/// at least one, otherwise it falls back to the latency thresholds.
pub fn aggregate_runs(
    endpoint: &str,
    runs: &[&RunResult],
    thresholds: &LatencyThresholds,
) -> AggregateResult {
    let runs: Vec<&RunResult> = runs
        .iter()
        .copied()
        .filter(|r| r.status != Status::Unavailable)
        .collect();
    let total_requests: u64 = runs.iter().map(|r| r.requests).sum();
    let total_errors: u64 = runs.iter().map(|r| r.errors).sum();
    let avg_ms = mean_defined(runs.iter().map(|r| r.avg_ms));

    let observed: Vec<&RunResult> = runs
        .iter()
        .copied()
        .filter(|r| r.errors_observed)
        .collect();
    let failures = (!observed.is_empty()).then(|| {
        (
            observed.iter().map(|r| r.errors).sum::<u64>(),
            observed.iter().map(|r| r.requests).sum::<u64>(),
        )
    });
    let status = classify(failures, avg_ms, thresholds);

    AggregateResult {
        endpoint: endpoint.to_string(),
        runs: runs.len(),
        total_requests,
        total_errors,
        mean_requests: mean_defined(runs.iter().map(|r| Some(r.requests as f64))),
        success_rate_percent: mean_defined(runs.iter().map(|r| r.success_rate_percent)),
        avg_ms,
        min_ms: min_defined(runs.iter().map(|r| r.min_ms)),
        max_ms: max_defined(runs.iter().map(|r| r.max_ms)),
        p90_ms: mean_defined(runs.iter().map(|r| r.p90_ms)),
        p95_ms: mean_defined(runs.iter().map(|r| r.p95_ms)),
        p99_ms: mean_defined(runs.iter().map(|r| r.p99_ms)),
        status,
    }
}

/// Group every run's results by endpoint and aggregate each group.
///
/// Endpoints keep the order in which they are first seen.
pub fn aggregate_all(
    runs: &[Vec<RunResult>],
    thresholds: &LatencyThresholds,
) -> Vec<AggregateResult> {
    let mut order: Vec<&str> = Vec::new();
    for result in runs.iter().flatten() {
        if !order.contains(&result.endpoint.as_str()) {
            order.push(&result.endpoint);
        }
    }

    order
        .into_iter()
        .map(|endpoint| {
            let group: Vec<&RunResult> = runs
                .iter()
                .flatten()
                .filter(|r| r.endpoint == endpoint)
                .collect();
            aggregate_runs(endpoint, &group, thresholds)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// OverallSummary - totals across endpoints of one run
// ---------------------------------------------------------------------------

/// Totals across all endpoints of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OverallSummary {
    pub total_requests: u64,
    pub total_errors: u64,
    /// Mean of the endpoints' average latencies that are defined.
    pub mean_avg_ms: Option<f64>,
    /// `(requests - errors) / requests` in percent.
    pub success_rate_percent: Option<f64>,
}

impl OverallSummary {
    pub fn from_results(results: &[RunResult]) -> Self {
        let total_requests: u64 = results.iter().map(|r| r.requests).sum();
        let total_errors: u64 = results.iter().map(|r| r.errors).sum();
        Self {
            total_requests,
            total_errors,
            mean_avg_ms: mean_defined(results.iter().map(|r| r.avg_ms)),
            success_rate_percent: percent_of(
                total_requests.saturating_sub(total_errors) as f64,
                total_requests as f64,
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Report - single run across all endpoints
// ---------------------------------------------------------------------------

/// Everything a renderer needs for a single run of every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Report {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub results: Vec<RunResult>,
    pub summary: OverallSummary,
    /// `None` when no endpoint has a defined average latency.
    pub ranking: Option<Ranking>,
}

impl Report {
    pub fn new(results: Vec<RunResult>) -> Self {
        let summary = OverallSummary::from_results(&results);
        let ranking = rank(&results);
        Self {
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            results,
            summary,
            ranking,
        }
    }
}

// ---------------------------------------------------------------------------
// MultiRunReport - N runs across all endpoints
// ---------------------------------------------------------------------------

/// Everything a renderer needs for repeated runs of every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MultiRunReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub run_count: usize,
    /// Raw results, outer index is the run, inner the endpoint.
    pub runs: Vec<Vec<RunResult>>,
    pub aggregates: Vec<AggregateResult>,
    /// Requests across every run and endpoint.
    pub total_requests: u64,
    /// Mean of every defined per-run average latency.
    pub overall_avg_ms: Option<f64>,
    pub ranking: Option<Ranking>,
}

impl MultiRunReport {
    pub fn new(runs: Vec<Vec<RunResult>>, thresholds: &LatencyThresholds) -> Self {
        let aggregates = aggregate_all(&runs, thresholds);
        let ranking = rank(&aggregates);
        let total_requests = runs.iter().flatten().map(|r| r.requests).sum();
        let overall_avg_ms = mean_defined(runs.iter().flatten().map(|r| r.avg_ms));
        Self {
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            run_count: runs.len(),
            runs,
            aggregates,
            total_requests,
            overall_avg_ms,
            ranking,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
