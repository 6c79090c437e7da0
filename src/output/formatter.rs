//! Core formatting trait and the plain text implementation
//!
//! Per-measurement lines are stable plain text so they can be grepped from
//! scripts; the summary block is a small table.

use crate::{
    driver::{BenchmarkReport, CaseOutcome, CaseReport},
    error::{AppError, Result},
    stats::{Comparison, TimingResult},
    types::{Endpoint, TargetKind},
};
use std::fmt::Write as _;

/// Main trait for report formatting
pub trait OutputFormatter {
    /// Header naming the resolved endpoint
    fn format_header(&self, endpoint: &Endpoint) -> Result<String>;

    /// Value of the sanity computation evaluated before timing
    fn format_sanity_check(&self, values: &[f32]) -> Result<String>;

    /// One measurement line
    fn format_result(&self, target: TargetKind, label: &str, result: &TimingResult) -> Result<String>;

    /// One failure line; `target` is `None` when the case never ran
    fn format_failure(&self, target: Option<TargetKind>, label: &str, error: &AppError) -> Result<String>;

    /// Comparison table and scaling warnings for the whole run
    fn format_summary(&self, report: &BenchmarkReport) -> Result<String>;

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> Result<String>;

    /// All lines for one case, in the order the targets ran
    fn format_case(&self, report: &CaseReport) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        match &report.outcome {
            CaseOutcome::Completed { local, remote } => {
                lines.push(self.format_result(TargetKind::Local, &report.label, local)?);
                lines.push(self.format_result(TargetKind::Remote, &report.label, remote)?);
            }
            CaseOutcome::Failed { local, target, error } => {
                if let Some(local) = local {
                    lines.push(self.format_result(TargetKind::Local, &report.label, local)?);
                }
                lines.push(self.format_failure(*target, &report.label, error)?);
            }
        }
        Ok(lines)
    }
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Add min/max columns to the summary table
    pub verbose_mode: bool,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
        }
    }
}

/// Row data for table formatting
pub type RowData = Vec<String>;

/// Render a bordered, left-aligned table
pub(crate) fn render_table(headers: &[&str], rows: &[RowData]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            if idx < widths.len() {
                widths[idx] = widths[idx].max(cell.chars().count());
            }
        }
    }

    let border = || {
        let mut line = String::from("+");
        for &width in &widths {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line
    };

    let render_row = |cells: &[String]| {
        let mut line = String::from("|");
        for (cell, &width) in cells.iter().zip(&widths) {
            let padding = width.saturating_sub(cell.chars().count());
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(padding));
            line.push_str(" |");
        }
        line
    };

    let header: RowData = headers.iter().map(|h| h.to_string()).collect();
    let mut lines = vec![border(), render_row(&header), border()];
    lines.extend(rows.iter().map(|row| render_row(row)));
    lines.push(border());
    lines.join("\n")
}

/// Summary table rows shared by both formatters
pub(crate) fn summary_rows(report: &BenchmarkReport, verbose: bool) -> Vec<RowData> {
    report
        .cases
        .iter()
        .map(|case| {
            let cell = |target| {
                case.result(target)
                    .map(|r: &TimingResult| format!("{} ms", r.format_mean()))
                    .unwrap_or_else(|| "-".to_string())
            };
            let mut row = vec![case.label.clone(), cell(TargetKind::Local), cell(TargetKind::Remote)];
            match case.comparison() {
                Some(comparison) => {
                    row.push(format!("{:+.2} ms", comparison.overhead_ms));
                    row.push(format_ratio(&comparison));
                }
                None => {
                    row.push("FAILED".to_string());
                    row.push("-".to_string());
                }
            }
            if verbose {
                for target in [TargetKind::Local, TargetKind::Remote] {
                    row.push(
                        case.result(target)
                            .map(|r| format!("{:.2}..{:.2}", r.min_ms, r.max_ms))
                            .unwrap_or_else(|| "-".to_string()),
                    );
                }
            }
            row
        })
        .collect()
}

pub(crate) fn summary_headers(verbose: bool) -> Vec<&'static str> {
    let mut headers = vec!["Case", "CPU mean", "TPU mean", "Overhead", "Ratio"];
    if verbose {
        headers.extend(["CPU range (ms)", "TPU range (ms)"]);
    }
    headers
}

pub(crate) fn format_ratio(comparison: &Comparison) -> String {
    comparison
        .ratio
        .map(|r| format!("{:.2}x", r))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Sanity values print like the scalar they are, so `4.0` shows as `4`
pub(crate) fn sanity_text(values: &[f32]) -> String {
    match values {
        [single] => single.to_string(),
        many => format!("{:?}", many),
    }
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, endpoint: &Endpoint) -> Result<String> {
        Ok(format!("TPU URL: {}", endpoint.url()))
    }

    fn format_sanity_check(&self, values: &[f32]) -> Result<String> {
        Ok(sanity_text(values))
    }

    fn format_result(&self, target: TargetKind, label: &str, result: &TimingResult) -> Result<String> {
        Ok(format!(
            "{} {} time: {} ms (std {})",
            target.label(),
            label,
            result.format_mean(),
            result.format_std()
        ))
    }

    fn format_failure(&self, target: Option<TargetKind>, label: &str, error: &AppError) -> Result<String> {
        Ok(match target {
            Some(target) => format!("{} {} FAILED: {}", target.label(), label, error),
            None => format!("{} FAILED: {}", label, error),
        })
    }

    fn format_summary(&self, report: &BenchmarkReport) -> Result<String> {
        let mut output = String::new();
        writeln!(
            output,
            "Summary for {} ({}): {} completed, {} failed",
            report.accelerator,
            report.endpoint.url(),
            report.completed_count(),
            report.failed_count()
        )
        .map_err(|e| AppError::internal(format!("Failed to format summary: {}", e)))?;

        let headers = summary_headers(self.options.verbose_mode);
        output.push_str(&render_table(
            &headers,
            &summary_rows(report, self.options.verbose_mode),
        ));

        for violation in report.scaling_violations() {
            output.push('\n');
            output.push_str(&self.format_warning(&format!("Scaling regression: {}", violation.describe()))?);
        }

        Ok(output)
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("WARNING: {}", warning))
    }
}
