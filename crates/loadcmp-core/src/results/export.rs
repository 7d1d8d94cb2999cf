use serde::Serialize;

use super::{AggregateResult, MultiRunReport, Ranking, Report, RunResult};
use crate::error::LoadcmpError;

/// Placeholder shown wherever a value was not measured.
pub const UNAVAILABLE: &str = "N/A";

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Milliseconds rounded to a whole number, e.g. `"812ms"`.
pub fn fmt_ms(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}ms", v.round()),
        None => UNAVAILABLE.to_string(),
    }
}

/// Percentage with one decimal place, e.g. `"99.2%"`.
pub fn fmt_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.1}%"),
        None => UNAVAILABLE.to_string(),
    }
}

fn csv_field(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// JSON export
// ---------------------------------------------------------------------------

/// Export any report as pretty-printed JSON. Unavailable values become `null`.
pub fn export_json<T: Serialize>(report: &T) -> Result<String, LoadcmpError> {
    Ok(serde_json::to_string_pretty(report)?)
}

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

/// Export per-endpoint run results as CSV, one row per result.
///
/// Unavailable values are left as empty cells.
pub fn export_csv(results: &[RunResult]) -> Result<String, LoadcmpError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "endpoint",
        "requests",
        "errors",
        "success_rate_percent",
        "avg_ms",
        "min_ms",
        "max_ms",
        "p90_ms",
        "p95_ms",
        "p99_ms",
        "status",
    ])?;
    for r in results {
        writer.write_record([
            r.endpoint.clone(),
            r.requests.to_string(),
            r.errors.to_string(),
            csv_field(r.success_rate_percent),
            csv_field(r.avg_ms),
            csv_field(r.min_ms),
            csv_field(r.max_ms),
            csv_field(r.p90_ms),
            csv_field(r.p95_ms),
            csv_field(r.p99_ms),
            r.status.to_string(),
        ])?;
    }
    into_string(writer)
}

/// Export cross-run aggregates as CSV, one row per endpoint.
pub fn export_aggregates_csv(aggregates: &[AggregateResult]) -> Result<String, LoadcmpError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "endpoint",
        "runs",
        "total_requests",
        "total_errors",
        "success_rate_percent",
        "avg_ms",
        "min_ms",
        "max_ms",
        "p90_ms",
        "p95_ms",
        "p99_ms",
        "status",
    ])?;
    for a in aggregates {
        writer.write_record([
            a.endpoint.clone(),
            a.runs.to_string(),
            a.total_requests.to_string(),
            a.total_errors.to_string(),
            csv_field(a.success_rate_percent),
            csv_field(a.avg_ms),
            csv_field(a.min_ms),
            csv_field(a.max_ms),
            csv_field(a.p90_ms),
            csv_field(a.p95_ms),
            csv_field(a.p99_ms),
            a.status.to_string(),
        ])?;
    }
    into_string(writer)
}

fn into_string(writer: csv::Writer<Vec<u8>>) -> Result<String, LoadcmpError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| LoadcmpError::Internal(format!("CSV flush failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| LoadcmpError::Internal(format!("CSV is not UTF-8: {e}")))
}

// ---------------------------------------------------------------------------
// Plain-text tables
// ---------------------------------------------------------------------------

/// Lay out rows as a pipe-separated table with padded columns.
fn render_rows(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<String>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c:<w$}"))
            .collect();
        format!("| {} |\n", padded.join(" | "))
    };
    let rule = format!(
        "|{}|\n",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("|")
    );

    let mut out = line(header.iter().map(|h| h.to_string()).collect());
    out.push_str(&rule);
    for row in rows {
        out.push_str(&line(row.clone()));
    }
    out.push_str(&rule);
    out
}

fn render_ranking(out: &mut String, ranking: Option<&Ranking>) {
    match ranking {
        Some(r) => {
            out.push_str(&format!(
                "Best:  {} ({})\n",
                r.best.endpoint,
                fmt_ms(Some(r.best.avg_ms))
            ));
            out.push_str(&format!(
                "Worst: {} ({})\n",
                r.worst.endpoint,
                fmt_ms(Some(r.worst.avg_ms))
            ));
            out.push_str(&format!(
                "Gap:   {} ({} slower)\n",
                fmt_ms(Some(r.gap_ms)),
                fmt_percent(r.relative_gap_percent)
            ));
            if !r.excluded.is_empty() {
                out.push_str(&format!("Not ranked: {}\n", r.excluded.join(", ")));
            }
        }
        None => out.push_str("No endpoint has latency data to rank.\n"),
    }
}

/// Render a single-run report as a console table followed by a summary.
pub fn render_table(report: &Report) -> String {
    let header = [
        "Endpoint", "Requests", "Errors", "Success", "Avg", "Min", "Max", "P95", "P99", "Status",
    ];
    let rows: Vec<Vec<String>> = report
        .results
        .iter()
        .map(|r| {
            vec![
                r.endpoint.clone(),
                r.requests.to_string(),
                r.errors.to_string(),
                fmt_percent(r.success_rate_percent),
                fmt_ms(r.avg_ms),
                fmt_ms(r.min_ms),
                fmt_ms(r.max_ms),
                fmt_ms(r.p95_ms),
                fmt_ms(r.p99_ms),
                r.status.label().to_string(),
            ]
        })
        .collect();

    let s = &report.summary;
    let mut out = render_rows(&header, &rows);
    out.push('\n');
    out.push_str(&format!("Total requests: {}\n", s.total_requests));
    out.push_str(&format!("Total errors:   {}\n", s.total_errors));
    out.push_str(&format!("Mean latency:   {}\n", fmt_ms(s.mean_avg_ms)));
    out.push_str(&format!("Success rate:   {}\n", fmt_percent(s.success_rate_percent)));
    out.push('\n');
    render_ranking(&mut out, report.ranking.as_ref());
    out
}

/// Render a multi-run report: one row per endpoint aggregate.
pub fn render_multi_run_table(report: &MultiRunReport) -> String {
    let header = [
        "Endpoint", "Runs", "Requests", "Avg", "Fastest", "Slowest", "P90", "P95", "Status",
    ];
    let rows: Vec<Vec<String>> = report
        .aggregates
        .iter()
        .map(|a| {
            vec![
                a.endpoint.clone(),
                a.runs.to_string(),
                a.total_requests.to_string(),
                fmt_ms(a.avg_ms),
                fmt_ms(a.min_ms),
                fmt_ms(a.max_ms),
                fmt_ms(a.p90_ms),
                fmt_ms(a.p95_ms),
                a.status.label().to_string(),
            ]
        })
        .collect();

    let mut out = render_rows(&header, &rows);
    out.push('\n');
    out.push_str(&format!("Runs:           {}\n", report.run_count));
    out.push_str(&format!("Total requests: {}\n", report.total_requests));
    out.push_str(&format!("Overall mean:   {}\n", fmt_ms(report.overall_avg_ms)));
    out.push('\n');
    render_ranking(&mut out, report.ranking.as_ref());
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{LatencyThresholds, Status};

    fn make_run(endpoint: &str, avg_ms: Option<f64>) -> RunResult {
        RunResult {
            endpoint: endpoint.to_string(),
            requests: 600,
            errors: 0,
            errors_observed: true,
            success_rate_percent: Some(99.16),
            avg_ms,
            min_ms: Some(35.4),
            max_ms: Some(3200.0),
            p90_ms: Some(1510.0),
            p95_ms: Some(1900.0),
            p99_ms: None,
            status: Status::Pass,
        }
    }

    // -----------------------------------------------------------------------
    // helpers
    // -----------------------------------------------------------------------

    #[test]
    fn fmt_ms_rounds_for_display() {
        assert_eq!(fmt_ms(Some(812.4)), "812ms");
        assert_eq!(fmt_ms(Some(812.5)), "813ms");
        assert_eq!(fmt_ms(Some(0.0)), "0ms");
        assert_eq!(fmt_ms(None), "N/A");
    }

    #[test]
    fn fmt_percent_one_decimal() {
        assert_eq!(fmt_percent(Some(50.0)), "50.0%");
        assert_eq!(fmt_percent(Some(200.0)), "200.0%");
        assert_eq!(fmt_percent(None), "N/A");
    }

    // -----------------------------------------------------------------------
    // JSON
    // -----------------------------------------------------------------------

    #[test]
    fn export_json_is_valid_json() {
        let report = Report::new(vec![make_run("old", Some(100.0)), make_run("static", None)]);
        let json = export_json(&report).expect("export_json should not fail");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
        assert!(parsed.get("report_id").is_some());
        assert_eq!(parsed["results"][0]["endpoint"], "old");
        assert!(parsed["results"][1]["avg_ms"].is_null());
        assert_eq!(parsed["ranking"]["best"]["endpoint"], "old");
    }

    // -----------------------------------------------------------------------
    // CSV
    // -----------------------------------------------------------------------

    #[test]
    fn export_csv_header_and_rows() {
        let csv = export_csv(&[make_run("old", Some(812.4)), RunResult::unavailable("static")])
            .expect("export_csv should not fail");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "endpoint,requests,errors,success_rate_percent,avg_ms,min_ms,max_ms,p90_ms,p95_ms,p99_ms,status"
        );
        assert_eq!(lines[1], "old,600,0,99.16,812.4,35.4,3200,1510,1900,,pass");
        assert_eq!(lines[2], "static,0,0,,,,,,,,n/a");
    }

    #[test]
    fn export_csv_quotes_awkward_endpoint_names() {
        let csv = export_csv(&[make_run("a,b", Some(1.0))]).expect("export_csv should not fail");
        assert!(csv.contains("\"a,b\""));
    }

    #[test]
    fn export_aggregates_csv_rows() {
        let runs = vec![vec![make_run("old", Some(100.0))], vec![make_run("old", Some(300.0))]];
        let report = MultiRunReport::new(runs, &LatencyThresholds::default());
        let csv = export_aggregates_csv(&report.aggregates).expect("export should not fail");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("old,2,1200,0,99.16,200,35.4,3200,"));
    }

    // -----------------------------------------------------------------------
    // Tables
    // -----------------------------------------------------------------------

    #[test]
    fn render_table_shows_rows_summary_and_ranking() {
        let report = Report::new(vec![
            make_run("old", Some(300.0)),
            make_run("random", Some(100.0)),
            RunResult::unavailable("static"),
        ]);
        let table = render_table(&report);
        assert!(table.contains("| Endpoint"));
        assert!(table.contains("| old "));
        assert!(table.contains("N/A"));
        assert!(table.contains("Unavailable"));
        assert!(table.contains("Total requests: 1200"));
        assert!(table.contains("Best:  random (100ms)"));
        assert!(table.contains("Worst: old (300ms)"));
        assert!(table.contains("Gap:   200ms (200.0% slower)"));
        assert!(table.contains("Not ranked: static"));
    }

    #[test]
    fn render_table_columns_are_aligned() {
        let report = Report::new(vec![
            make_run("old", Some(1.0)),
            make_run("a-much-longer-name", Some(2.0)),
        ]);
        let table = render_table(&report);
        let widths: Vec<usize> = table
            .lines()
            .take_while(|l| !l.is_empty())
            .map(|l| l.chars().count())
            .collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn render_table_without_latency() {
        let report = Report::new(vec![RunResult::unavailable("old")]);
        let table = render_table(&report);
        assert!(table.contains("No endpoint has latency data to rank."));
        assert!(table.contains("Success rate:   N/A"));
    }

    #[test]
    fn render_multi_run_table_lists_aggregates() {
        let runs = vec![
            vec![make_run("old", Some(500.0)), make_run("static", Some(50.0))],
            vec![make_run("old", Some(500.0)), make_run("static", Some(70.0))],
        ];
        let report = MultiRunReport::new(runs, &LatencyThresholds::default());
        let table = render_multi_run_table(&report);
        assert!(table.contains("| old "));
        assert!(table.contains("500ms"));
        assert!(table.contains("Runs:           2"));
        assert!(table.contains("Best:  static (60ms)"));
    }
}
