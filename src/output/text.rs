//! Human-readable text output formatter

use super::{display_file, OutputFormatter};
use crate::diagnostic::{Diagnostic, Origin, Severity};
use crate::report::LintResult;
use colored::*;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// Show help text
    pub show_help: bool,

    /// Show statistics
    pub show_stats: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            show_help: true,
            show_stats: true,
        }
    }
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.colored {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn severity_str(&self, severity: Severity) -> String {
        let style: fn(&str) -> ColoredString = match severity {
            Severity::Error => |s| s.red().bold(),
            Severity::Warning => |s| s.yellow().bold(),
            Severity::Information => |s| s.blue(),
            Severity::Hint => |s| s.dimmed(),
        };
        self.paint(&severity.to_string(), style)
    }

    fn plural(count: usize, singular: &str, plural: &str) -> String {
        format!("{} {}", count, if count == 1 { singular } else { plural })
    }

    fn summary(&self, result: &LintResult) -> String {
        let mut output = format!(
            "\n{} processed",
            Self::plural(result.files_processed(), "file", "files")
        );

        let counts = &result.counts;
        let mut parts = Vec::new();
        if counts.errors > 0 {
            parts.push(self.paint(&Self::plural(counts.errors, "error", "errors"), |s| s.red()));
        }
        if counts.warnings > 0 {
            parts.push(self.paint(&Self::plural(counts.warnings, "warning", "warnings"), |s| {
                s.yellow()
            }));
        }
        if counts.information > 0 {
            parts.push(self.paint(&Self::plural(counts.information, "info", "infos"), |s| s.blue()));
        }
        if counts.hints > 0 {
            parts.push(self.paint(&Self::plural(counts.hints, "hint", "hints"), |s| s.dimmed()));
        }

        if parts.is_empty() {
            output.push_str(&format!(": {}", self.paint("no problems", |s| s.green())));
        } else {
            output.push_str(&format!(": {}", parts.join(", ")));
        }
        output.push('\n');
        output.push_str(&format!("Finished in {:.2}s\n", result.duration.as_secs_f64()));
        output
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, result: &LintResult) -> String {
        let mut output = String::new();

        for file in &result.files {
            if file.result.is_empty() {
                continue;
            }
            output.push_str(&self.paint(&file.path.display().to_string(), |s| s.underline()));
            output.push('\n');

            for diagnostic in file.result.sorted() {
                output.push_str(&self.format_diagnostic(diagnostic));
            }
            output.push('\n');
        }

        if self.show_stats {
            output.push_str(&self.summary(result));
        }

        output
    }

    fn format_diagnostic(&self, diag: &Diagnostic) -> String {
        let mut output = format!(
            "  {}: {}[{}]: {}\n",
            self.paint(&diag.path.to_string(), |s| s.dimmed()),
            self.severity_str(diag.severity),
            self.paint(&diag.code, |s| s.cyan()),
            diag.message
        );

        if diag.origin == Origin::Engine {
            output.push_str(&format!(
                "   {} in {}\n",
                self.paint("= engine failure", |s| s.red()),
                display_file(diag)
            ));
        }

        if self.show_help {
            if let Some(help) = &diag.help {
                output.push_str(&format!("   {} help: {}\n", self.paint("=", |s| s.blue()), help));
            }
        }

        for note in &diag.notes {
            output.push_str(&format!("   {} note: {}\n", self.paint("=", |s| s.blue()), note));
        }

        output
    }
}
