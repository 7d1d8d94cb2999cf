//! Scraper for the end-of-test summary that k6 prints to stdout.
//!
//! Each field is looked up on its own, so a summary that lacks some lines
//! (different k6 versions and verbosity settings print different sets)
//! still yields every field that is present.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classify::{classify, LatencyThresholds};
use crate::results::RunResult;

/// Separator between a metric label and its value: k6 pads labels with dot
/// leaders (`http_reqs......: 600`), older output with spaces.
const LABEL_SEP: &str = r"[.\s]*:\s*";

/// Compile a pattern anchored on a metric label followed by [`LABEL_SEP`].
fn labelled(label: &str, value: &str) -> Regex {
    Regex::new(&format!(r"\b{label}\b{LABEL_SEP}{value}"))
        .expect("summary label pattern is valid")
}

static REQUESTS_RE: LazyLock<Regex> = LazyLock::new(|| labelled("http_reqs", r"(\d+)"));
static CHECKS_SUCCEEDED_RE: LazyLock<Regex> =
    LazyLock::new(|| labelled("checks_succeeded", r"(\d+(?:\.\d+)?)%"));
static CHECKS_RE: LazyLock<Regex> = LazyLock::new(|| labelled("checks", r"(\d+(?:\.\d+)?)%"));
static DURATION_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| labelled("http_req_duration", r"(.*)"));
static FAILED_OUT_OF_RE: LazyLock<Regex> =
    LazyLock::new(|| labelled("http_req_failed", r"\d+(?:\.\d+)?%\s+(\d+)\s+out of"));
static FAILED_LEGACY_RE: LazyLock<Regex> =
    LazyLock::new(|| labelled("http_req_failed", r"\d+(?:\.\d+)?%\s+✓\s*(\d+)"));

/// `key=value` pairs on the `http_req_duration` line.
static DURATION_STAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(avg|min|med|max|p\(90\)|p\(95\)|p\(99\))=(\S+)")
        .expect("duration stat pattern is valid")
});

/// One number/unit pair of a duration token.
static DURATION_PART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)(µs|us|ms|s|m|h)").expect("duration pattern is valid")
});

// ---------------------------------------------------------------------------
// SummaryFields
// ---------------------------------------------------------------------------

/// Raw fields found in one text summary. Durations are in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SummaryFields {
    pub requests: Option<u64>,
    pub errors: Option<u64>,
    pub success_rate_percent: Option<f64>,
    pub avg_ms: Option<f64>,
    pub min_ms: Option<f64>,
    pub med_ms: Option<f64>,
    pub max_ms: Option<f64>,
    pub p90_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

impl SummaryFields {
    /// Whether nothing at all was recognised.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Turn the scraped fields into a [`RunResult`] for `endpoint`.
    ///
    /// The status is error-based only when both the request and the failure
    /// counts were printed; otherwise it is derived from the mean latency.
    pub fn into_run_result(self, endpoint: &str, thresholds: &LatencyThresholds) -> RunResult {
        let requests = self.requests.unwrap_or(0);
        let errors = self.errors.unwrap_or(0).min(requests);
        let errors_observed = self.requests.is_some() && self.errors.is_some();
        let status = classify(
            errors_observed.then_some((errors, requests)),
            self.avg_ms,
            thresholds,
        );

        RunResult {
            endpoint: endpoint.to_string(),
            requests,
            errors,
            errors_observed,
            success_rate_percent: self.success_rate_percent,
            avg_ms: self.avg_ms,
            min_ms: self.min_ms,
            max_ms: self.max_ms,
            p90_ms: self.p90_ms,
            p95_ms: self.p95_ms,
            p99_ms: self.p99_ms,
            status,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Extract every recognised field from a k6 text summary.
pub fn parse_summary_fields(text: &str) -> SummaryFields {
    let mut fields = SummaryFields {
        requests: capture(&REQUESTS_RE, text).and_then(|v| v.parse().ok()),
        errors: parse_failed_count(text),
        success_rate_percent: capture(&CHECKS_SUCCEEDED_RE, text)
            .or_else(|| capture(&CHECKS_RE, text))
            .and_then(|v| v.parse().ok()),
        ..SummaryFields::default()
    };

    let Some(line) = capture(&DURATION_LINE_RE, text) else {
        return fields;
    };
    for caps in DURATION_STAT_RE.captures_iter(line) {
        let slot = match &caps[1] {
            "avg" => &mut fields.avg_ms,
            "min" => &mut fields.min_ms,
            "med" => &mut fields.med_ms,
            "max" => &mut fields.max_ms,
            "p(90)" => &mut fields.p90_ms,
            "p(95)" => &mut fields.p95_ms,
            "p(99)" => &mut fields.p99_ms,
            _ => continue,
        };
        if slot.is_none() {
            *slot = parse_duration_ms(&caps[2]);
        }
    }
    fields
}

/// Parse a k6 text summary straight into a [`RunResult`].
pub fn parse_summary(endpoint: &str, text: &str, thresholds: &LatencyThresholds) -> RunResult {
    let fields = parse_summary_fields(text);
    if fields.is_empty() {
        tracing::debug!("{endpoint}: no recognisable fields in text summary");
    }
    fields.into_run_result(endpoint, thresholds)
}

/// Failed request count from the `http_req_failed` line.
///
/// Newer k6 prints `0.83% 5 out of 600`; older releases print
/// `0.83% ✓ 5 ✗ 595`, where the ✓ column counts failed requests.
fn parse_failed_count(text: &str) -> Option<u64> {
    capture(&FAILED_OUT_OF_RE, text)
        .or_else(|| capture(&FAILED_LEGACY_RE, text))
        .and_then(|v| v.parse().ok())
}

/// Convert a k6 duration token such as `250.5ms`, `1.5s`, `812µs` or
/// `1m2.5s` into milliseconds.
///
/// Returns `None` unless the whole token is made of number/unit pairs.
pub fn parse_duration_ms(token: &str) -> Option<f64> {
    let mut total = 0.0;
    let mut consumed = 0;
    for caps in DURATION_PART_RE.captures_iter(token) {
        let whole = caps.get(0)?;
        if whole.start() != consumed {
            return None;
        }
        consumed = whole.end();
        let value: f64 = caps[1].parse().ok()?;
        total += match &caps[2] {
            "µs" | "us" => value / 1_000.0,
            "ms" => value,
            "s" => value * 1_000.0,
            "m" => value * 60_000.0,
            "h" => value * 3_600_000.0,
            _ => return None,
        };
    }
    (consumed > 0 && consumed == token.len()).then_some(total)
}

/// First capture group of `re` in `text`.
fn capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Status;

    const K6_SUMMARY_V1: &str = "
  █ TOTAL RESULTS

    checks_total.......................: 1800    290.3/s
    checks_succeeded...................: 99.16%  1785 out of 1800
    checks_failed......................: 0.83%   15 out of 1800

    HTTP
    http_req_duration..................: avg=812.4ms  min=35.12ms  med=640.7ms  max=3.2s  p(90)=1.51s  p(95)=1.9s
      { expected_response:true }.......: avg=800ms    min=35.12ms  med=640.7ms  max=3.2s  p(90)=1.5s   p(95)=1.88s
    http_req_failed....................: 0.83%   5 out of 600
    http_reqs..........................: 600     96.8/s
";

    const K6_SUMMARY_LEGACY: &str = "
     checks.........................: 100.00% ✓ 1800      ✗ 0
     data_received..................: 2.1 MB  340 kB/s
     http_req_duration..............: avg=1.2s     min=512.3µs med=1.1s     max=2.5s    p(90)=2.1s    p(95)=2.3s
     http_req_failed................: 0.00%   ✓ 0         ✗ 600
     http_reqs......................: 600     97.3/s
";

    #[test]
    fn parses_current_summary_format() {
        let f = parse_summary_fields(K6_SUMMARY_V1);
        assert_eq!(f.requests, Some(600));
        assert_eq!(f.errors, Some(5));
        assert_eq!(f.success_rate_percent, Some(99.16));
        assert_eq!(f.avg_ms, Some(812.4));
        assert_eq!(f.min_ms, Some(35.12));
        assert_eq!(f.med_ms, Some(640.7));
        assert_eq!(f.max_ms, Some(3200.0));
        assert_eq!(f.p90_ms, Some(1510.0));
        assert_eq!(f.p95_ms, Some(1900.0));
        assert_eq!(f.p99_ms, None);
    }

    #[test]
    fn parses_legacy_summary_format() {
        let f = parse_summary_fields(K6_SUMMARY_LEGACY);
        assert_eq!(f.requests, Some(600));
        assert_eq!(f.errors, Some(0));
        assert_eq!(f.success_rate_percent, Some(100.0));
        assert_eq!(f.avg_ms, Some(1200.0));
        assert!((f.min_ms.expect("min should parse") - 0.5123).abs() < 1e-9);
        assert_eq!(f.max_ms, Some(2500.0));
        assert_eq!(f.p90_ms, Some(2100.0));
    }

    #[test]
    fn space_separated_labels_are_accepted() {
        let text = "http_reqs     : 42\nhttp_req_failed  : 2.38%  1 out of 42\nhttp_req_duration  : avg=10ms min=1ms max=20ms";
        let f = parse_summary_fields(text);
        assert_eq!(f.requests, Some(42));
        assert_eq!(f.errors, Some(1));
        assert_eq!(f.avg_ms, Some(10.0));
        assert_eq!(f.max_ms, Some(20.0));
    }

    #[test]
    fn missing_labels_leave_fields_unavailable() {
        let f = parse_summary_fields("http_reqs..........: 10   1/s\n");
        assert_eq!(f.requests, Some(10));
        assert_eq!(f.errors, None);
        assert_eq!(f.avg_ms, None);
        assert_eq!(f.success_rate_percent, None);

        let empty = parse_summary_fields("");
        assert!(empty.is_empty());
    }

    #[test]
    fn summary_patterns_compile() {
        for re in [
            &REQUESTS_RE,
            &CHECKS_SUCCEEDED_RE,
            &CHECKS_RE,
            &DURATION_LINE_RE,
            &FAILED_OUT_OF_RE,
            &FAILED_LEGACY_RE,
            &DURATION_STAT_RE,
            &DURATION_PART_RE,
        ] {
            assert!(!re.as_str().is_empty());
        }
    }

    #[test]
    fn first_duration_line_wins() {
        let f = parse_summary_fields(
            "http_req_duration...: avg=10ms min=1ms\nhttp_req_duration...: avg=99ms max=5ms\n",
        );
        assert_eq!(f.avg_ms, Some(10.0));
        assert_eq!(f.max_ms, None);
    }

    #[test]
    fn seconds_and_milliseconds_normalize_identically() {
        assert_eq!(parse_duration_ms("1.5s"), parse_duration_ms("1500ms"));
        assert_eq!(parse_duration_ms("1.5s"), Some(1500.0));
    }

    #[test]
    fn duration_units() {
        assert_eq!(parse_duration_ms("250ms"), Some(250.0));
        assert_eq!(parse_duration_ms("2s"), Some(2000.0));
        assert_eq!(parse_duration_ms("500µs"), Some(0.5));
        assert_eq!(parse_duration_ms("500us"), Some(0.5));
        assert_eq!(parse_duration_ms("1m2.5s"), Some(62_500.0));
        assert_eq!(parse_duration_ms("0s"), Some(0.0));
    }

    #[test]
    fn malformed_durations_are_rejected() {
        assert_eq!(parse_duration_ms(""), None);
        assert_eq!(parse_duration_ms("fast"), None);
        assert_eq!(parse_duration_ms("12"), None);
        assert_eq!(parse_duration_ms("12ms!"), None);
        assert_eq!(parse_duration_ms("x12ms"), None);
    }

    #[test]
    fn full_precision_is_retained() {
        let f = parse_summary_fields("http_req_duration...: avg=123.456ms min=1ms max=2ms");
        assert_eq!(f.avg_ms, Some(123.456));
    }

    #[test]
    fn into_run_result_uses_error_policy_when_counts_present() {
        let r = parse_summary("old", K6_SUMMARY_V1, &LatencyThresholds::default());
        assert_eq!(r.endpoint, "old");
        assert_eq!(r.requests, 600);
        assert_eq!(r.errors, 5);
        assert!(r.errors_observed);
        assert_eq!(r.status, Status::Warn);
    }

    #[test]
    fn into_run_result_falls_back_to_latency_policy() {
        let text = "http_reqs......: 600\nhttp_req_duration......: avg=1.2s min=1s max=2s";
        let r = parse_summary("random", text, &LatencyThresholds::default());
        assert!(!r.errors_observed);
        assert_eq!(r.status, Status::Warn);
    }

    #[test]
    fn empty_summary_is_unavailable_not_zero() {
        let r = parse_summary("static", "", &LatencyThresholds::default());
        assert_eq!(r.requests, 0);
        assert_eq!(r.avg_ms, None);
        assert_eq!(r.status, Status::Unavailable);
    }
}
