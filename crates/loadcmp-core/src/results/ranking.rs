use serde::{Deserialize, Serialize};

use super::{AggregateResult, RunResult};
use crate::stats::percent_of;

/// Anything that can be ranked by mean latency.
pub trait Ranked {
    fn endpoint(&self) -> &str;
    fn avg_ms(&self) -> Option<f64>;
}

impl Ranked for RunResult {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn avg_ms(&self) -> Option<f64> {
        self.avg_ms
    }
}

impl Ranked for AggregateResult {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn avg_ms(&self) -> Option<f64> {
        self.avg_ms
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RankedEndpoint {
    pub endpoint: String,
    pub avg_ms: f64,
}

/// Fastest vs. slowest endpoint by mean latency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Ranking {
    pub best: RankedEndpoint,
    pub worst: RankedEndpoint,
    /// `worst - best` in milliseconds.
    pub gap_ms: f64,
    /// Gap relative to the best endpoint, in percent. `None` when best is 0.
    pub relative_gap_percent: Option<f64>,
    /// Endpoints left out because their mean latency is unavailable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded: Vec<String>,
}

/// Rank `items` by mean latency.
///
/// Items without a mean are skipped. On ties the earlier item wins both
/// best and worst. Returns `None` if nothing can be ranked.
pub fn rank<T: Ranked>(items: &[T]) -> Option<Ranking> {
    let mut best: Option<(&str, f64)> = None;
    let mut worst: Option<(&str, f64)> = None;
    let mut excluded = Vec::new();

    for item in items {
        let Some(avg) = item.avg_ms() else {
            excluded.push(item.endpoint().to_string());
            continue;
        };
        if best.map_or(true, |(_, b)| avg < b) {
            best = Some((item.endpoint(), avg));
        }
        if worst.map_or(true, |(_, w)| avg > w) {
            worst = Some((item.endpoint(), avg));
        }
    }

    let (best_name, best_avg) = best?;
    let (worst_name, worst_avg) = worst?;
    let gap_ms = worst_avg - best_avg;

    Some(Ranking {
        best: RankedEndpoint {
            endpoint: best_name.to_string(),
            avg_ms: best_avg,
        },
        worst: RankedEndpoint {
            endpoint: worst_name.to_string(),
            avg_ms: worst_avg,
        },
        gap_ms,
        relative_gap_percent: percent_of(gap_ms, best_avg),
        excluded,
    })
}
