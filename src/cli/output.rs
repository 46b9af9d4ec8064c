//! Output formatting for fabric-precheck.
//!
//! Provides terminal and JSON output formatters. Both produce valid output
//! for any report, including an empty one.

use crate::build_info::{get_build_info, BuildInfo};
use crate::cli::args::OutputFormat;
use crate::engine::result::{PrecheckReport, ResultSummary};
use crate::{CheckResult, ResultKind};
use serde::Serialize;

const RULE: &str = "--------------------------------------------------------------------------------";

/// Trait for output formatters
pub trait OutputFormatter {
    /// Format a precheck report into a string
    fn format(&self, report: &PrecheckReport) -> String;
}

/// Terminal (human-readable) formatter
pub struct TerminalFormatter {
    color: bool,
    verbose: bool,
}

impl TerminalFormatter {
    pub fn new(color: bool, verbose: bool) -> Self {
        TerminalFormatter { color, verbose }
    }

    fn colorize(&self, text: &str, color_code: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", color_code, text)
        } else {
            text.to_string()
        }
    }

    fn status(&self, result: &CheckResult) -> String {
        let label = format!("[{}]", result.kind());
        match result.kind() {
            ResultKind::Pass => self.colorize(&label, "32"),
            ResultKind::FailOrchestrator | ResultKind::FailUpgradeFailure => self.colorize(&label, "31"),
            ResultKind::ManualReviewRequired | ResultKind::Error => self.colorize(&label, "33"),
            ResultKind::NotApplicable => self.colorize(&label, "90"),
        }
    }

    fn push_evidence(&self, output: &mut String, result: &CheckResult) {
        if !result.headers().is_empty() {
            output.push_str(&format!("      {}\n", result.headers().join(" | ")));
        }
        for row in result.data() {
            output.push_str(&format!("      {}\n", row.join(" | ")));
        }
    }
}

impl OutputFormatter for TerminalFormatter {
    fn format(&self, report: &PrecheckReport) -> String {
        let mut output = String::new();

        output.push_str(RULE);
        output.push('\n');
        output.push_str(&format!("fabric-precheck {} pre-upgrade report\n", get_build_info().version));
        output.push_str(RULE);
        output.push_str("\n\n");

        for (id, result) in report.results() {
            match report.name(id) {
                Some(name) => output.push_str(&format!("  {} {}: {}\n", self.status(result), id, name)),
                None => output.push_str(&format!("  {} {}\n", self.status(result), id)),
            }
            if self.verbose || result.kind() != ResultKind::Pass {
                self.push_evidence(&mut output, result);
            }
        }

        if !report.timed_out().is_empty() {
            output.push_str(&format!("\nTimed out: {}\n", report.timed_out().join(", ")));
        }

        let summary = report.summary();
        output.push('\n');
        output.push_str(RULE);
        output.push('\n');
        output.push_str(&format!(
            "SUMMARY: {} passed, {} failed, {} manual, {} n/a, {} errors ({} total)\n",
            summary.passed,
            summary.failed(),
            summary.manual,
            summary.not_applicable,
            summary.errors,
            summary.total
        ));
        output.push_str(&format!(
            "Total time: {:.1}s\n",
            report.total_duration_ms() as f64 / 1000.0
        ));
        let code = exit_code(&summary);
        output.push_str(&format!("Exit code: {} ({})\n", code, exit_description(code)));
        output.push_str(RULE);

        output
    }
}

/// JSON formatter
pub struct JsonFormatter {
    pretty: bool,
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    tool: BuildInfo,
    summary: ResultSummary,
    #[serde(flatten)]
    report: &'a PrecheckReport,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        JsonFormatter { pretty }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, report: &PrecheckReport) -> String {
        let document = JsonDocument {
            tool: get_build_info(),
            summary: report.summary(),
            report,
        };
        let rendered = if self.pretty {
            serde_json::to_string_pretty(&document)
        } else {
            serde_json::to_string(&document)
        };
        rendered.unwrap_or_else(|e| error_document(&e.to_string()))
    }
}

/// Minimal JSON document carrying only an error message
fn error_document(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

/// Process exit code for a summary: 0 clean, 1 any failure, 2 manual review
/// or errors without failures.
pub fn exit_code(summary: &ResultSummary) -> u8 {
    if summary.failed() > 0 {
        1
    } else if summary.manual > 0 || summary.errors > 0 {
        2
    } else {
        0
    }
}

fn exit_description(code: u8) -> &'static str {
    match code {
        0 => "no blocking issues",
        1 => "upgrade blockers detected",
        _ => "review required",
    }
}

/// Get the appropriate formatter for the output format
pub fn get_formatter(format: OutputFormat, color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => Box::new(TerminalFormatter::new(color, verbose)),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}
