//! Shared harness for catalog integration tests

#![allow(dead_code)]

use apistyle::{CatalogLoader, Diagnostic, Engine, EvaluationResult, Severity};
use std::sync::Arc;

/// Strip the common leading indentation so documents can be written inline
pub fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    text.lines()
        .map(|line| if line.len() >= indent { &line[indent..] } else { line.trim_start() })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Evaluates documents against one built-in catalog
pub struct Harness {
    engine: Engine,
}

impl Harness {
    pub fn new(ruleset: &str) -> Self {
        let catalog = CatalogLoader::new()
            .load(ruleset)
            .unwrap_or_else(|e| panic!("catalog {} failed to load: {}", ruleset, e));
        Self {
            engine: Engine::new(Arc::new(catalog)),
        }
    }

    pub fn validate(&self, spec: &str) -> EvaluationResult {
        let source = dedent(spec);
        self.engine
            .evaluate_source(&source)
            .unwrap_or_else(|e| panic!("document failed to parse: {}\n{}", e, source))
    }

    /// No diagnostic carries `code`
    pub fn validate_success(&self, spec: &str, code: &str) {
        let result = self.validate(spec);
        let found: Vec<&Diagnostic> = result.by_code(code).collect();
        assert!(found.is_empty(), "expected no {} diagnostics, got {:#?}", code, found);
    }

    /// Exactly `count` diagnostics carry `code` at `severity`
    pub fn validate_failure(&self, spec: &str, code: &str, severity: Severity, count: usize) {
        let result = self.validate(spec);
        let found = result.by_code_and_severity(code, severity).count();
        assert_eq!(
            found,
            count,
            "expected {} {} diagnostic(s) of {}, got {:#?}",
            count,
            severity,
            code,
            result.by_code(code).collect::<Vec<_>>()
        );
    }
}
