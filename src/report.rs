//! Evaluation results
//!
//! [`EvaluationResult`] holds the diagnostics of one document; [`LintResult`]
//! aggregates many documents together with per-rule timings.

use crate::diagnostic::{Diagnostic, Severity};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

/// Diagnostic totals per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub errors: usize,
    pub warnings: usize,
    pub information: usize,
    pub hints: usize,
}

impl SeverityCounts {
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Information => self.information += 1,
            Severity::Hint => self.hints += 1,
        }
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Error => self.errors,
            Severity::Warning => self.warnings,
            Severity::Information => self.information,
            Severity::Hint => self.hints,
        }
    }

    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.information + self.hints
    }

    /// Number of diagnostics at or above `threshold`
    pub fn at_least(&self, threshold: Severity) -> usize {
        Severity::ALL
            .iter()
            .filter(|severity| **severity >= threshold)
            .map(|severity| self.get(*severity))
            .sum()
    }

    fn merge(&mut self, other: &SeverityCounts) {
        self.errors += other.errors;
        self.warnings += other.warnings;
        self.information += other.information;
        self.hints += other.hints;
    }
}

/// All diagnostics for one document, in evaluation order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationResult {
    diagnostics: Vec<Diagnostic>,
}

impl EvaluationResult {
    /// Build a result, dropping repeated (code, path, message) entries
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        let mut result = Self::default();
        result.extend(diagnostics);
        result
    }

    /// Append diagnostics, keeping the first of any duplicate
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        let mut seen: HashSet<(String, crate::document::NodePath, String)> = self
            .diagnostics
            .iter()
            .map(|d| {
                let (code, path, message) = d.identity();
                (code.to_string(), path.clone(), message.to_string())
            })
            .collect();

        for diagnostic in diagnostics {
            let (code, path, message) = diagnostic.identity();
            if seen.insert((code.to_string(), path.clone(), message.to_string())) {
                self.diagnostics.push(diagnostic);
            }
        }
    }

    pub fn all(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn by_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }

    pub fn by_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.diagnostics.iter().filter(move |d| d.severity == severity)
    }

    pub fn by_code_and_severity<'a>(
        &'a self,
        code: &'a str,
        severity: Severity,
    ) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.by_code(code).filter(move |d| d.severity == severity)
    }

    /// Diagnostics ordered most severe first; ties keep evaluation order
    pub fn sorted(&self) -> Vec<&Diagnostic> {
        let mut sorted: Vec<&Diagnostic> = self.diagnostics.iter().collect();
        sorted.sort_by(|a, b| b.severity.cmp(&a.severity));
        sorted
    }

    /// Keep only diagnostics at or above `threshold`
    pub fn retain_min_severity(&mut self, threshold: Severity) {
        self.diagnostics.retain(|d| d.severity >= threshold);
    }

    pub fn counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for diagnostic in &self.diagnostics {
            counts.add(diagnostic.severity);
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// 1 when any diagnostic is at or above `fail_on`, else 0
    pub fn exit_code(&self, fail_on: Severity) -> i32 {
        if self.counts().at_least(fail_on) > 0 {
            1
        } else {
            0
        }
    }
}

/// Per-rule timing statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleTiming {
    pub code: String,
    /// Total time spent on this rule
    pub total_time: Duration,
    /// Number of documents the rule ran against
    pub evaluation_count: usize,
    /// Nodes selected by the rule's selectors
    pub match_count: usize,
    /// Diagnostics produced
    pub diagnostic_count: usize,
}

impl RuleTiming {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            ..Default::default()
        }
    }

    pub fn avg_time(&self) -> Duration {
        if self.evaluation_count > 0 {
            self.total_time / self.evaluation_count as u32
        } else {
            Duration::ZERO
        }
    }

    fn merge(&mut self, other: &RuleTiming) {
        self.total_time += other.total_time;
        self.evaluation_count += other.evaluation_count;
        self.match_count += other.match_count;
        self.diagnostic_count += other.diagnostic_count;
    }
}

/// Result for one linted file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileResult {
    pub path: PathBuf,
    pub result: EvaluationResult,
}

/// Aggregate result of linting many files
#[derive(Debug, Default)]
pub struct LintResult {
    /// Per-file results in input order
    pub files: Vec<FileResult>,

    pub counts: SeverityCounts,

    pub files_with_errors: usize,

    pub files_with_warnings: usize,

    pub duration: Duration,

    /// Per-rule timing (code -> timing)
    pub rule_timings: HashMap<String, RuleTiming>,
}

impl LintResult {
    /// Result for a single file
    pub fn single(path: PathBuf, result: EvaluationResult, timings: Vec<RuleTiming>) -> Self {
        let counts = result.counts();
        Self {
            files_with_errors: usize::from(counts.errors > 0),
            files_with_warnings: usize::from(counts.warnings > 0),
            counts,
            files: vec![FileResult { path, result }],
            duration: Duration::ZERO,
            rule_timings: timings
                .into_iter()
                .map(|timing| (timing.code.clone(), timing))
                .collect(),
        }
    }

    pub fn files_processed(&self) -> usize {
        self.files.len()
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.files.iter().flat_map(|file| file.result.all())
    }

    pub fn has_errors(&self) -> bool {
        self.counts.errors > 0
    }

    pub fn is_clean(&self) -> bool {
        self.counts.total() == 0
    }

    /// 1 when any diagnostic is at or above `fail_on`, else 0
    pub fn exit_code(&self, fail_on: Severity) -> i32 {
        if self.counts.at_least(fail_on) > 0 {
            1
        } else {
            0
        }
    }

    /// Append another result; files stay in the order they were merged
    pub fn merge(&mut self, other: LintResult) {
        self.files.extend(other.files);
        self.counts.merge(&other.counts);
        self.files_with_errors += other.files_with_errors;
        self.files_with_warnings += other.files_with_warnings;

        for (code, timing) in other.rule_timings {
            self.rule_timings
                .entry(code)
                .or_insert_with(|| RuleTiming::new(&timing.code))
                .merge(&timing);
        }
    }

    /// Drop diagnostics below `threshold` and recount
    pub fn retain_min_severity(&mut self, threshold: Severity) {
        let mut counts = SeverityCounts::default();
        let mut with_errors = 0;
        let mut with_warnings = 0;
        for file in &mut self.files {
            file.result.retain_min_severity(threshold);
            let file_counts = file.result.counts();
            counts.merge(&file_counts);
            with_errors += usize::from(file_counts.errors > 0);
            with_warnings += usize::from(file_counts.warnings > 0);
        }
        self.counts = counts;
        self.files_with_errors = with_errors;
        self.files_with_warnings = with_warnings;
    }

    /// Timings sorted by total time, slowest first
    pub fn sorted_timings(&self) -> Vec<&RuleTiming> {
        let mut timings: Vec<_> = self.rule_timings.values().collect();
        timings.sort_by(|a, b| b.total_time.cmp(&a.total_time).then(a.code.cmp(&b.code)));
        timings
    }

    pub fn format_timings(&self) -> String {
        let timings = self.sorted_timings();
        if timings.is_empty() {
            return "No timing data available".to_string();
        }

        let mut output = String::from("Rule timing:\n");
        output.push_str(&format!(
            "{:<48} {:>12} {:>12} {:>8} {:>12}\n",
            "Rule", "Total", "Avg", "Matches", "Diagnostics"
        ));
        output.push_str(&"-".repeat(96));
        output.push('\n');

        for timing in timings {
            output.push_str(&format!(
                "{:<48} {:>10.2}ms {:>10.2}µs {:>8} {:>12}\n",
                timing.code,
                timing.total_time.as_secs_f64() * 1000.0,
                timing.avg_time().as_secs_f64() * 1_000_000.0,
                timing.match_count,
                timing.diagnostic_count
            ));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{NodePath, PathSegment};
    use pretty_assertions::assert_eq;

    fn diag(code: &str, severity: Severity, key: &str) -> Diagnostic {
        let path: NodePath = vec![PathSegment::from(key)].into_iter().collect();
        Diagnostic::new(code, severity, "message", path)
    }

    #[test]
    fn test_dedup_keeps_first() {
        let result = EvaluationResult::new(vec![
            diag("a", Severity::Error, "x"),
            diag("a", Severity::Warning, "x"),
            diag("a", Severity::Error, "y"),
        ]);
        assert_eq!(result.len(), 2);
        assert_eq!(result.all()[0].severity, Severity::Error);
    }

    #[test]
    fn test_views() {
        let result = EvaluationResult::new(vec![
            diag("a", Severity::Warning, "x"),
            diag("b", Severity::Error, "y"),
            diag("a", Severity::Error, "z"),
        ]);
        assert_eq!(result.by_code("a").count(), 2);
        assert_eq!(result.by_severity(Severity::Error).count(), 2);
        assert_eq!(result.by_code_and_severity("a", Severity::Error).count(), 1);
        assert_eq!(result.by_code("missing").count(), 0);

        let sorted: Vec<&str> = result.sorted().iter().map(|d| d.code.as_str()).collect();
        assert_eq!(sorted, vec!["b", "a", "a"]);
    }

    #[test]
    fn test_counts_and_exit_code() {
        let result = EvaluationResult::new(vec![
            diag("a", Severity::Warning, "x"),
            diag("b", Severity::Hint, "y"),
        ]);
        let counts = result.counts();
        assert_eq!(counts.warnings, 1);
        assert_eq!(counts.hints, 1);
        assert_eq!(counts.total(), 2);
        assert!(!result.has_errors());
        assert_eq!(result.exit_code(Severity::Error), 0);
        assert_eq!(result.exit_code(Severity::Warning), 1);
        assert_eq!(EvaluationResult::default().exit_code(Severity::Hint), 0);
    }

    #[test]
    fn test_lint_result_merge() {
        let mut total = LintResult::default();
        let mut timing = RuleTiming::new("a");
        timing.match_count = 2;
        total.merge(LintResult::single(
            PathBuf::from("one.yaml"),
            EvaluationResult::new(vec![diag("a", Severity::Error, "x")]),
            vec![timing.clone()],
        ));
        total.merge(LintResult::single(
            PathBuf::from("two.yaml"),
            EvaluationResult::new(vec![diag("a", Severity::Warning, "x")]),
            vec![timing],
        ));

        assert_eq!(total.files_processed(), 2);
        assert_eq!(total.counts.errors, 1);
        assert_eq!(total.counts.warnings, 1);
        assert_eq!(total.files_with_errors, 1);
        assert_eq!(total.rule_timings["a"].match_count, 4);
        assert_eq!(total.files[1].path, PathBuf::from("two.yaml"));
    }

    #[test]
    fn test_retain_min_severity() {
        let mut total = LintResult::single(
            PathBuf::from("one.yaml"),
            EvaluationResult::new(vec![
                diag("a", Severity::Error, "x"),
                diag("b", Severity::Hint, "y"),
            ]),
            vec![],
        );
        total.retain_min_severity(Severity::Warning);
        assert_eq!(total.counts.total(), 1);
        assert_eq!(total.diagnostics().count(), 1);
    }
}
