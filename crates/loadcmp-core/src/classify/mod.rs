//! Status tiers derived from error counts or latency thresholds.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Health tier of an endpoint for one run or an aggregate of runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pass,
    Warn,
    Fail,
    /// No signal was available to classify on (e.g. the input was missing).
    #[default]
    Unavailable,
}

impl Status {
    /// Human-readable label for reports.
    pub fn label(&self) -> &'static str {
        match self {
            Status::Pass => "Excellent",
            Status::Warn => "Warning",
            Status::Fail => "Error",
            Status::Unavailable => "Unavailable",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Pass => "pass",
            Status::Warn => "warn",
            Status::Fail => "fail",
            Status::Unavailable => "n/a",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// Which classification rule applies to a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// Classify on failed vs. total request counts.
    ErrorBased,
    /// Classify on mean latency against [`LatencyThresholds`].
    LatencyBased,
}

/// Latency cut-offs for the latency-based policy, in milliseconds.
///
/// `avg < warn_ms` is a pass, `avg < fail_ms` a warning, anything else fails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LatencyThresholds {
    pub warn_ms: f64,
    pub fail_ms: f64,
}

impl Default for LatencyThresholds {
    fn default() -> Self {
        Self {
            warn_ms: 1000.0,
            fail_ms: 2000.0,
        }
    }
}

/// Which inputs a caller actually has for a result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signals {
    /// Failed-request counts were observed and can be trusted.
    pub failures: bool,
    /// A mean latency is defined.
    pub latency: bool,
}

/// Pick the policy for the given signals.
///
/// Error-based wins whenever a failure signal exists; latency-based is only a
/// fallback. With neither signal there is nothing to classify on.
pub fn select_policy(signals: Signals) -> Option<StatusPolicy> {
    if signals.failures {
        Some(StatusPolicy::ErrorBased)
    } else if signals.latency {
        Some(StatusPolicy::LatencyBased)
    } else {
        None
    }
}

/// Error-based rule: no failures is a pass, some failures a warning, and no
/// requests at all a failure.
pub fn classify_errors(errors: u64, requests: u64) -> Status {
    match (errors, requests) {
        (_, 0) => Status::Fail,
        (0, _) => Status::Pass,
        _ => Status::Warn,
    }
}

/// Latency-based rule on a mean latency in milliseconds.
pub fn classify_latency(avg_ms: f64, thresholds: &LatencyThresholds) -> Status {
    if avg_ms < thresholds.warn_ms {
        Status::Pass
    } else if avg_ms < thresholds.fail_ms {
        Status::Warn
    } else {
        Status::Fail
    }
}

/// Classify a result, choosing the policy from what is available.
///
/// `failures` is `Some((errors, requests))` when the failure signal is
/// reliable.
pub fn classify(
    failures: Option<(u64, u64)>,
    avg_ms: Option<f64>,
    thresholds: &LatencyThresholds,
) -> Status {
    let signals = Signals {
        failures: failures.is_some(),
        latency: avg_ms.is_some(),
    };
    match (select_policy(signals), failures, avg_ms) {
        (Some(StatusPolicy::ErrorBased), Some((errors, requests)), _) => {
            classify_errors(errors, requests)
        }
        (Some(StatusPolicy::LatencyBased), _, Some(avg)) => classify_latency(avg, thresholds),
        _ => Status::Unavailable,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
