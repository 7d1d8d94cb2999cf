//! Telemetry record model for the k6 newline-delimited JSON output.
//!
//! Each line of a `k6 run --out json=...` capture looks like
//! `{"type":"Point","metric":"http_reqs","data":{"value":1,"tags":{...}}}`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const METRIC_HTTP_REQS: &str = "http_reqs";
pub const METRIC_HTTP_REQ_FAILED: &str = "http_req_failed";
pub const METRIC_HTTP_REQ_DURATION: &str = "http_req_duration";
pub const METRIC_CHECKS: &str = "checks";

/// Tag key carrying the free-text check name on `checks` points.
pub const CHECK_TAG: &str = "check";

// ---------------------------------------------------------------------------
// RecordKind
// ---------------------------------------------------------------------------

/// The `type` discriminator of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordKind {
    /// A single observed data point. The only kind that feeds statistics.
    Point,
    /// A metric declaration emitted once per metric.
    Metric,
    /// Anything else the tool may emit in future versions.
    Other,
}

impl RecordKind {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "Point" => RecordKind::Point,
            "Metric" => RecordKind::Metric,
            _ => RecordKind::Other,
        }
    }
}

// ---------------------------------------------------------------------------
// TelemetryEvent
// ---------------------------------------------------------------------------

/// One normalized telemetry record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TelemetryEvent {
    pub kind: RecordKind,
    pub metric: String,
    pub value: f64,
    pub tags: HashMap<String, String>,
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(rename = "type")]
    kind: String,
    metric: String,
    data: RawData,
}

#[derive(Deserialize)]
struct RawData {
    value: f64,
    #[serde(default)]
    tags: Option<HashMap<String, serde_json::Value>>,
}

impl TelemetryEvent {
    /// Build a `Point` event, mostly useful for feeding an accumulator directly.
    pub fn point(metric: impl Into<String>, value: f64) -> Self {
        Self {
            kind: RecordKind::Point,
            metric: metric.into(),
            value,
            tags: HashMap::new(),
        }
    }

    /// Attach a tag, builder style.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Parse a single log line.
    ///
    /// Returns `None` for blank or malformed lines. Non-string tag values are
    /// dropped rather than failing the whole record.
    pub fn parse_line(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_str::<RawRecord>(trimmed) {
            Ok(raw) => {
                let tags = raw
                    .data
                    .tags
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|(k, v)| match v {
                        serde_json::Value::String(s) => Some((k, s)),
                        _ => None,
                    })
                    .collect();
                Some(Self {
                    kind: RecordKind::from_tag(&raw.kind),
                    metric: raw.metric,
                    value: raw.data.value,
                    tags,
                })
            }
            Err(e) => {
                tracing::trace!("skipping malformed telemetry line: {e}");
                None
            }
        }
    }

    /// Classify this event into the metric it contributes to.
    ///
    /// Returns `None` for anything that is not a `Point`.
    pub fn sample(&self) -> Option<MetricSample<'_>> {
        if self.kind != RecordKind::Point {
            return None;
        }
        let sample = match self.metric.as_str() {
            METRIC_HTTP_REQS => MetricSample::Requests(self.value),
            METRIC_HTTP_REQ_FAILED => MetricSample::Failures(self.value),
            METRIC_HTTP_REQ_DURATION => MetricSample::DurationMs(self.value),
            METRIC_CHECKS => MetricSample::Check {
                name: self.tags.get(CHECK_TAG).map(String::as_str),
                passed: self.value == 1.0,
            },
            _ => MetricSample::Other,
        };
        Some(sample)
    }
}

// ---------------------------------------------------------------------------
// MetricSample
// ---------------------------------------------------------------------------

/// What a `Point` event contributes to a run's accumulators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricSample<'a> {
    /// Request count increment (may be batched, so summed by value).
    Requests(f64),
    /// Failed request count increment.
    Failures(f64),
    /// One check evaluation.
    Check { name: Option<&'a str>, passed: bool },
    /// One request duration in milliseconds.
    DurationMs(f64),
    /// A metric this engine does not track.
    Other,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
