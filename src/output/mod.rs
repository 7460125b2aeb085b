//! Output formatters for lint results

mod compact;
mod json;
mod text;

pub use compact::CompactFormatter;
pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::config::OutputFormat;
use crate::diagnostic::Diagnostic;
use crate::report::LintResult;

/// Renders lint results for a terminal or another program
pub trait OutputFormatter: Send + Sync {
    /// Format the entire lint result
    fn format(&self, result: &LintResult) -> String;

    /// Format a single diagnostic
    fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String;
}

/// Formatter for a configured output format
pub fn formatter_for(format: OutputFormat, colored: bool, show_stats: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => {
            let mut formatter = TextFormatter::new();
            formatter.colored = colored;
            formatter.show_stats = show_stats;
            Box::new(formatter)
        }
        OutputFormat::Json => Box::new(JsonFormatter::new().pretty()),
        OutputFormat::Compact => Box::new(CompactFormatter::new()),
    }
}

/// `file` or `<input>` when a diagnostic has no file
pub(crate) fn display_file(diagnostic: &Diagnostic) -> String {
    diagnostic
        .file
        .as_ref()
        .map(|f| f.display().to_string())
        .unwrap_or_else(|| "<input>".to_string())
}
