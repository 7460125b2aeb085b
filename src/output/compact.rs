//! Compact output formatter
//!
//! One line per diagnostic, for grep and editors.

use super::{display_file, OutputFormatter};
use crate::diagnostic::Diagnostic;
use crate::report::LintResult;

/// `file:path: severity: code: message`
pub struct CompactFormatter {
    pub show_severity: bool,
    pub show_code: bool,
}

impl CompactFormatter {
    pub fn new() -> Self {
        Self {
            show_severity: true,
            show_code: true,
        }
    }

    pub fn without_severity(mut self) -> Self {
        self.show_severity = false;
        self
    }

    pub fn without_code(mut self) -> Self {
        self.show_code = false;
        self
    }
}

impl Default for CompactFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for CompactFormatter {
    fn format(&self, result: &LintResult) -> String {
        let mut output = String::new();
        for diagnostic in result.diagnostics() {
            output.push_str(&self.format_diagnostic(diagnostic));
            output.push('\n');
        }
        output
    }

    fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        let mut parts = vec![format!("{}:{}", display_file(diagnostic), diagnostic.path)];
        if self.show_severity {
            parts.push(diagnostic.severity.to_string());
        }
        if self.show_code {
            parts.push(diagnostic.code.clone());
        }
        parts.push(diagnostic.message.clone());
        parts.join(": ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;
    use crate::document::NodePath;
    use crate::report::EvaluationResult;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn diagnostic(code: &str, severity: Severity) -> Diagnostic {
        let path: NodePath = ["info", "version"].into_iter().collect();
        Diagnostic::new(code, severity, "bad version", path).with_file("api.yaml")
    }

    #[test]
    fn test_compact_format() {
        let output = CompactFormatter::new().format_diagnostic(&diagnostic("semver", Severity::Warning));
        assert_eq!(output, "api.yaml:$.info.version: warning: semver: bad version");
    }

    #[test]
    fn test_compact_minimal() {
        let formatter = CompactFormatter::new().without_severity().without_code();
        let output = formatter.format_diagnostic(&diagnostic("semver", Severity::Error));
        assert_eq!(output, "api.yaml:$.info.version: bad version");
    }

    #[test]
    fn test_compact_result() {
        let result = LintResult::single(
            PathBuf::from("api.yaml"),
            EvaluationResult::new(vec![
                diagnostic("a", Severity::Error),
                diagnostic("b", Severity::Warning),
            ]),
            vec![],
        );
        let output = CompactFormatter::new().format(&result);
        assert_eq!(output.lines().count(), 2);
    }
}
