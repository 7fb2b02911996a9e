//! Report rendering for sweep results: plain console summary or JSON for
//! CI archiving.

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use serde_json::json;
use std::fmt::Write as _;
use std::time::Duration;

use crate::simulation::SimReport;

#[must_use]
pub fn render_console(reports: &[SimReport], elapsed: Duration) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "Tavernkeep sweep results".bold());
    for report in reports {
        let status = if report.violations.is_empty() {
            "ok".green().to_string()
        } else {
            format!("{} violations", report.violations.len())
                .red()
                .to_string()
        };
        let _ = writeln!(
            out,
            "  seed {:>10}  inns {:>2}  ticks {:>7}  cycles {:>4}  settlements {:>4}  stale {:>3}  paid {:>8}  [{}]",
            report.seed,
            report.inns,
            report.ticks_driven,
            report.cycles_completed,
            report.settlements,
            report.stale_ticks,
            report.total_paid,
            status
        );
        for violation in &report.violations {
            let _ = writeln!(out, "    {} {}", "!".red().bold(), violation);
        }
        if report.dismissals > 0 {
            let _ = writeln!(
                out,
                "    {} staff dismissed in {} settlement(s)",
                "·".dimmed(),
                report.dismissals
            );
        }
    }
    let _ = writeln!(out, "  finished in {elapsed:.2?}");
    out
}

/// JSON document suitable for archiving next to CI runs.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(reports: &[SimReport], elapsed: Duration) -> Result<String> {
    let doc = json!({
        "generated_at": Utc::now().to_rfc3339(),
        "elapsed_ms": elapsed.as_millis(),
        "sweeps": reports,
    });
    Ok(format!("{}\n", serde_json::to_string_pretty(&doc)?))
}
