//! Run summary rendering
//!
//! Per-case lines plus totals. Skips are reported with their reason class so
//! they are never mistaken for passes or conflated with failures.

use crate::runner::{CaseStatus, RunReport};

fn status_tag(status: CaseStatus) -> &'static str {
    match status {
        CaseStatus::Passed => "PASS",
        CaseStatus::Failed => "FAIL",
        CaseStatus::SkippedTimeout => "SKIP(timeout)",
        CaseStatus::SkippedResource => "SKIP(resource)",
    }
}

/// Render the human-readable run summary
#[must_use]
pub fn render_summary(report: &RunReport) -> String {
    let mut out = String::new();
    for record in &report.records {
        let detail = if record.detail.is_empty() {
            String::new()
        } else {
            format!(" - {}", record.detail)
        };
        out.push_str(&format!(
            "{:<14} {} ({}) {}ms{}\n",
            status_tag(record.status),
            record.model,
            record.kind,
            record.duration_ms,
            detail
        ));
    }

    out.push_str(&format!(
        "\n{} passed, {} failed, {} skipped ({} timeout, {} resource) in {:.1}s\n",
        report.passed(),
        report.failed(),
        report.skipped(),
        report.count(CaseStatus::SkippedTimeout),
        report.count(CaseStatus::SkippedResource),
        report.duration_ms as f64 / 1000.0,
    ));

    if report.aborted {
        out.push_str("run aborted: hard deadline reached with work in flight\n");
    }
    out
}
