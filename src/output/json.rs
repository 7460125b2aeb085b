//! JSON output formatter

use super::{display_file, OutputFormatter};
use crate::diagnostic::{Diagnostic, Origin};
use crate::report::LintResult;
use serde::Serialize;

/// Machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_default()
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    diagnostics: Vec<JsonDiagnostic<'a>>,
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    code: &'a str,
    severity: String,
    message: &'a str,
    file: String,
    path: String,
    pointer: String,
    origin: Origin,
    #[serde(skip_serializing_if = "Option::is_none")]
    help: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    notes: Vec<&'a str>,
}

impl<'a> From<&'a Diagnostic> for JsonDiagnostic<'a> {
    fn from(d: &'a Diagnostic) -> Self {
        Self {
            code: &d.code,
            severity: d.severity.to_string(),
            message: &d.message,
            file: display_file(d),
            path: d.path.to_string(),
            pointer: d.path.to_pointer(),
            origin: d.origin,
            help: d.help.as_deref(),
            notes: d.notes.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Serialize)]
struct JsonSummary {
    files_processed: usize,
    files_with_errors: usize,
    files_with_warnings: usize,
    error_count: usize,
    warning_count: usize,
    information_count: usize,
    hint_count: usize,
    duration_ms: u128,
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, result: &LintResult) -> String {
        let output = JsonOutput {
            diagnostics: result.diagnostics().map(JsonDiagnostic::from).collect(),
            summary: JsonSummary {
                files_processed: result.files_processed(),
                files_with_errors: result.files_with_errors,
                files_with_warnings: result.files_with_warnings,
                error_count: result.counts.errors,
                warning_count: result.counts.warnings,
                information_count: result.counts.information,
                hint_count: result.counts.hints,
                duration_ms: result.duration.as_millis(),
            },
        };
        self.render(&output)
    }

    fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        self.render(&JsonDiagnostic::from(diagnostic))
    }
}
