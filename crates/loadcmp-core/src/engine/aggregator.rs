use std::io::BufRead;

use crate::classify::classify_errors;
use crate::results::RunResult;
use crate::stats::{percent_of, LatencyStats};
use crate::telemetry::{MetricSample, TelemetryEvent};

/// Check name fragment that marks the "status was 200" check.
pub const DEFAULT_CHECK_NAME: &str = "status was 200";

// ---------------------------------------------------------------------------
// RunAccumulator
// ---------------------------------------------------------------------------

/// Folds the telemetry events of one endpoint's run into a [`RunResult`].
///
/// Can be fed a whole captured log at once or one event at a time; both give
/// the same result.
#[derive(Debug, Clone)]
pub struct RunAccumulator {
    endpoint: String,
    check_name: String,
    requests: f64,
    failures: f64,
    checks_passed: u64,
    checks_total: u64,
    /// Every observed request duration (ms), kept for exact percentiles.
    durations: Vec<f64>,
}

impl RunAccumulator {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_check_name(endpoint, DEFAULT_CHECK_NAME)
    }

    /// Only `checks` points whose `check` tag contains `check_name` count
    /// toward the success rate.
    pub fn with_check_name(endpoint: impl Into<String>, check_name: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            check_name: check_name.into(),
            requests: 0.0,
            failures: 0.0,
            checks_passed: 0,
            checks_total: 0,
            durations: Vec::new(),
        }
    }

    /// Record one event. Non-`Point` events and untracked metrics are ignored.
    pub fn observe(&mut self, event: &TelemetryEvent) {
        match event.sample() {
            Some(MetricSample::Requests(v)) => self.requests += v,
            Some(MetricSample::Failures(v)) => self.failures += v,
            Some(MetricSample::Check { name, passed }) => {
                if name.is_some_and(|n| n.contains(self.check_name.as_str())) {
                    self.checks_total += 1;
                    if passed {
                        self.checks_passed += 1;
                    }
                }
            }
            Some(MetricSample::DurationMs(v)) => {
                if v.is_finite() {
                    self.durations.push(v);
                }
            }
            Some(MetricSample::Other) | None => {}
        }
    }

    /// Parse and record one raw log line.
    ///
    /// Returns `false` if the line was blank or malformed and got skipped.
    pub fn observe_line(&mut self, line: &str) -> bool {
        match TelemetryEvent::parse_line(line) {
            Some(event) => {
                self.observe(&event);
                true
            }
            None => false,
        }
    }

    /// Record every line of `content`.
    pub fn observe_str(&mut self, content: &str) {
        let skipped = content
            .lines()
            .filter(|line| !self.observe_line(line))
            .count();
        if skipped > 0 {
            tracing::debug!("{}: skipped {skipped} unparseable log lines", self.endpoint);
        }
    }

    /// Record every line read from `reader`.
    ///
    /// Lines that are not valid UTF-8 are skipped like any other malformed
    /// line; only a hard I/O error stops reading.
    pub fn observe_reader<R: BufRead>(&mut self, mut reader: R) -> std::io::Result<()> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                return Ok(());
            }
            if let Ok(line) = std::str::from_utf8(&buf) {
                self.observe_line(line);
            }
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn checks_passed(&self) -> u64 {
        self.checks_passed
    }

    pub fn checks_total(&self) -> u64 {
        self.checks_total
    }

    pub fn sample_count(&self) -> usize {
        self.durations.len()
    }

    /// Compute the run's statistics from everything observed so far.
    pub fn finalize(&self) -> RunResult {
        let requests = to_count(self.requests);
        let errors = to_count(self.failures).min(requests);
        let latency = LatencyStats::from_samples(&self.durations);

        RunResult {
            endpoint: self.endpoint.clone(),
            requests,
            errors,
            errors_observed: true,
            success_rate_percent: percent_of(self.checks_passed as f64, self.checks_total as f64),
            avg_ms: latency.avg_ms,
            min_ms: latency.min_ms,
            max_ms: latency.max_ms,
            p90_ms: latency.p90_ms,
            p95_ms: latency.p95_ms,
            p99_ms: latency.p99_ms,
            status: classify_errors(errors, requests),
        }
    }
}

/// Convert a summed counter to a whole count. Negative or non-finite sums
/// count as zero.
fn to_count(sum: f64) -> u64 {
    if sum.is_finite() && sum > 0.0 {
        sum.round() as u64
    } else {
        0
    }
}

/// Parse a complete captured log for one endpoint.
pub fn parse_log(endpoint: &str, check_name: &str, content: &str) -> RunResult {
    let mut acc = RunAccumulator::with_check_name(endpoint, check_name);
    acc.observe_str(content);
    acc.finalize()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
