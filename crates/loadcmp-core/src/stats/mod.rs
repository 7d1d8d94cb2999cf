//! Sample statistics and cross-run reductions.
//!
//! Every function returns `None` instead of `0.0` or `NaN` when it has no
//! data to work with, so an absent measurement can never be mistaken for a
//! real one.

use serde::{Deserialize, Serialize};

/// Nearest-rank percentile of `samples`.
///
/// `p` is a fraction in `[0.0, 1.0]`. The samples are sorted ascending and
/// the value at index `ceil(len * p) - 1` (clamped to the valid range) is
/// returned. No interpolation.
pub fn percentile(samples: &[f64], p: f64) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    percentile_sorted(&sorted, p)
}

/// Same as [`percentile`] but for input that is already sorted ascending.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (sorted.len() as f64 * p).ceil() as i64 - 1;
    let idx = rank.clamp(0, sorted.len() as i64 - 1) as usize;
    Some(sorted[idx])
}

pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

pub fn min(samples: &[f64]) -> Option<f64> {
    samples.iter().copied().reduce(f64::min)
}

pub fn max(samples: &[f64]) -> Option<f64> {
    samples.iter().copied().reduce(f64::max)
}

/// `part / whole * 100`, or `None` when `whole` is zero.
pub fn percent_of(part: f64, whole: f64) -> Option<f64> {
    if whole == 0.0 {
        return None;
    }
    let value = part * 100.0 / whole;
    value.is_finite().then_some(value)
}

// ---------------------------------------------------------------------------
// Cross-run reductions
// ---------------------------------------------------------------------------

/// Arithmetic mean over the defined values; `None` if none are defined.
pub fn mean_defined<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let defined: Vec<f64> = values.into_iter().flatten().collect();
    mean(&defined)
}

/// Smallest defined value; `None` if none are defined.
pub fn min_defined<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values.into_iter().flatten().reduce(f64::min)
}

/// Largest defined value; `None` if none are defined.
pub fn max_defined<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values.into_iter().flatten().reduce(f64::max)
}

// ---------------------------------------------------------------------------
// LatencyStats
// ---------------------------------------------------------------------------

/// Latency summary of one run, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LatencyStats {
    pub samples: usize,
    pub avg_ms: Option<f64>,
    pub min_ms: Option<f64>,
    pub max_ms: Option<f64>,
    pub p90_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

impl LatencyStats {
    /// Compute every statistic with a single sort of the samples.
    pub fn from_samples(samples: &[f64]) -> Self {
        let mut sorted = samples.to_vec();
        sorted.sort_unstable_by(f64::total_cmp);
        Self {
            samples: sorted.len(),
            avg_ms: mean(&sorted),
            min_ms: sorted.first().copied(),
            max_ms: sorted.last().copied(),
            p90_ms: percentile_sorted(&sorted, 0.90),
            p95_ms: percentile_sorted(&sorted, 0.95),
            p99_ms: percentile_sorted(&sorted, 0.99),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
