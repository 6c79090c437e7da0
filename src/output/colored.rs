//! Colored formatter implementation with terminal color support

use super::formatter::{
    render_table, sanity_text, summary_headers, summary_rows, FormattingOptions, OutputFormatter,
};
use crate::{
    driver::BenchmarkReport,
    error::{AppError, Result},
    stats::TimingResult,
    types::{Endpoint, TargetKind},
};
use colored::*;

/// How expensive the remote round trip is relative to the local baseline
#[derive(Debug, Clone, PartialEq)]
pub enum OverheadLevel {
    Negligible, // < 1.5x
    Moderate,   // 1.5x - 5x
    High,       // 5x - 20x
    Extreme,    // > 20x
}

impl OverheadLevel {
    /// Classify a remote/local mean ratio
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio < 1.5 {
            Self::Negligible
        } else if ratio < 5.0 {
            Self::Moderate
        } else if ratio < 20.0 {
            Self::High
        } else {
            Self::Extreme
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Negligible => Color::Green,
            Self::Moderate => Color::Cyan,
            Self::High => Color::Yellow,
            Self::Extreme => Color::Red,
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub local: Color,
    pub remote: Color,
    pub warning: Color,
    pub error: Color,
    pub muted: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            local: Color::Cyan,
            remote: Color::Magenta,
            warning: Color::Yellow,
            error: Color::Red,
            muted: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    /// Create a new colored formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self {
            options,
            color_scheme: ColorScheme::default(),
        }
    }

    /// Create a colored formatter with custom color scheme
    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        Self { options, color_scheme }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    fn target_label(&self, target: TargetKind) -> ColoredString {
        let color = match target {
            TargetKind::Local => self.color_scheme.local,
            TargetKind::Remote => self.color_scheme.remote,
        };
        self.colorize(target.label(), color).bold()
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, endpoint: &Endpoint) -> Result<String> {
        Ok(format!(
            "{} {}",
            self.colorize("TPU URL:", self.color_scheme.header).bold(),
            endpoint.url()
        ))
    }

    fn format_sanity_check(&self, values: &[f32]) -> Result<String> {
        Ok(sanity_text(values))
    }

    fn format_result(&self, target: TargetKind, label: &str, result: &TimingResult) -> Result<String> {
        Ok(format!(
            "{} {} time: {} ms {}",
            self.target_label(target),
            label,
            result.format_mean().bold(),
            self.colorize(&format!("(std {})", result.format_std()), self.color_scheme.muted)
        ))
    }

    fn format_failure(&self, target: Option<TargetKind>, label: &str, error: &AppError) -> Result<String> {
        let failed = self.colorize("FAILED:", self.color_scheme.error).bold();
        Ok(match target {
            Some(target) => format!("{} {} {} {}", self.target_label(target), label, failed, error),
            None => format!("{} {} {}", label, failed, error),
        })
    }

    fn format_summary(&self, report: &BenchmarkReport) -> Result<String> {
        let mut output = format!(
            "{} {} ({}): {} completed, {} failed\n",
            self.colorize("Summary for", self.color_scheme.header).bold(),
            report.accelerator,
            report.endpoint.url(),
            self.colorize(&report.completed_count().to_string(), Color::Green),
            if report.failed_count() > 0 {
                self.colorize(&report.failed_count().to_string(), self.color_scheme.error)
            } else {
                report.failed_count().to_string().normal()
            },
        );

        // Table cells stay uncolored so column widths line up
        let headers = summary_headers(self.options.verbose_mode);
        output.push_str(&render_table(
            &headers,
            &summary_rows(report, self.options.verbose_mode),
        ));

        for case in &report.cases {
            if let Some(ratio) = case.comparison().and_then(|c| c.ratio) {
                let level = OverheadLevel::from_ratio(ratio);
                output.push('\n');
                output.push_str(&format!(
                    "  {} TPU/CPU {}",
                    case.label,
                    self.colorize(&format!("{:.2}x", ratio), level.color())
                ));
            }
        }

        for violation in report.scaling_violations() {
            output.push('\n');
            output.push_str(&self.format_warning(&format!("Scaling regression: {}", violation.describe()))?);
        }

        Ok(output)
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("{} {}", self.colorize("⚠️ ", self.color_scheme.warning), self.colorize(warning, self.color_scheme.warning)))
    }
}
