//! Evaluation engine
//!
//! An [`Engine`] holds a loaded catalog and evaluates documents against it. Each
//! document is evaluated on one thread in catalog order; [`Engine::lint_files`]
//! spreads independent files over a rayon pool and reassembles results in input
//! order.
//!
//! A predicate that returns an error or panics does not abort the pass: the failure
//! becomes an engine diagnostic carrying the rule code, and evaluation continues
//! with the next check.

use crate::catalog::Catalog;
use crate::config::{Config, PerFileIgnores};
use crate::diagnostic::{Diagnostic, Severity};
use crate::document::{Document, DocumentError, Node, NodePath, PathSegment};
use crate::predicates::CheckInput;
use crate::report::{EvaluationResult, LintResult, RuleTiming};
use crate::rule::{Check, Field, MessageContext, Rule};
use crate::selector::Match;
use rayon::prelude::*;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Evaluates documents against one catalog
#[derive(Debug, Clone)]
pub struct Engine {
    catalog: Arc<Catalog>,
    config: Config,
    per_file: PerFileIgnores,
}

impl Engine {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            config: Config::default(),
            per_file: PerFileIgnores::default(),
        }
    }

    /// Apply rule selection, severity overrides and job settings from a config
    pub fn with_config(mut self, config: Config) -> Self {
        self.per_file = config.per_file_ignores();
        self.config = config;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether a rule runs for a document from `source`
    fn is_active(&self, rule: &Rule, source: Option<&Path>) -> bool {
        let explicitly_enabled = self.config.rules.enabled.iter().any(|c| c == rule.code());
        if !(rule.is_enabled() || explicitly_enabled) || !self.config.is_rule_enabled(rule.code()) {
            return false;
        }
        match source {
            Some(path) => !self.per_file.is_ignored(rule.code(), path),
            None => true,
        }
    }

    fn severity_for(&self, rule: &Rule) -> Severity {
        self.config
            .get_severity_override(rule.code())
            .unwrap_or_else(|| rule.severity())
    }

    /// Evaluate one document
    pub fn evaluate(&self, document: &Document) -> EvaluationResult {
        self.evaluate_with_timings(document).0
    }

    /// Parse YAML (or JSON) text and evaluate it
    pub fn evaluate_source(&self, content: &str) -> Result<EvaluationResult, DocumentError> {
        let document = Document::from_yaml(content)?;
        Ok(self.evaluate(&document))
    }

    /// Evaluate one document and record per-rule timings
    pub fn evaluate_with_timings(&self, document: &Document) -> (EvaluationResult, Vec<RuleTiming>) {
        let mut diagnostics = Vec::new();
        let mut timings = Vec::new();

        for rule in self.catalog.rules() {
            if !self.is_active(rule, document.source()) {
                continue;
            }

            let start = Instant::now();
            let (found, match_count) = self.evaluate_rule(rule, document);

            let mut timing = RuleTiming::new(rule.code());
            timing.total_time = start.elapsed();
            timing.evaluation_count = 1;
            timing.match_count = match_count;
            timing.diagnostic_count = found.len();
            timings.push(timing);

            if !found.is_empty() {
                log::debug!("{}: {} diagnostic(s)", rule.code(), found.len());
            }
            diagnostics.extend(found);
        }

        (EvaluationResult::new(diagnostics), timings)
    }

    /// Run every check of `rule` on every node its selectors match
    fn evaluate_rule(&self, rule: &Rule, document: &Document) -> (Vec<Diagnostic>, usize) {
        let mut seen = HashSet::new();
        let matches: Vec<Match<'_>> = rule
            .selectors()
            .iter()
            .flat_map(|selector| selector.select(document.root()))
            .filter(|m| seen.insert(m.path.clone()))
            .collect();

        let severity = self.severity_for(rule);
        let mut diagnostics = Vec::new();

        for m in &matches {
            for check in rule.checks() {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_check(rule, check, m, document, severity)
                }));

                let failure = match outcome {
                    Ok(Ok(found)) => {
                        diagnostics.extend(found);
                        continue;
                    }
                    Ok(Err(error)) => error,
                    Err(payload) => panic_message(payload.as_ref()),
                };

                log::warn!(
                    "Rule {} failed at {} ({}): {}",
                    rule.code(),
                    m.path,
                    check.function,
                    failure
                );
                let mut diagnostic = Diagnostic::engine(
                    rule.code(),
                    &format!("rule '{}' failed to evaluate: {}", rule.code(), failure),
                    m.path.clone(),
                );
                if let Some(source) = document.source() {
                    diagnostic = diagnostic.with_file(source);
                }
                diagnostics.push(diagnostic);
            }
        }

        (diagnostics, matches.len())
    }

    /// Lint one file; unreadable or unparsable files yield a `parse-error` diagnostic
    pub fn lint_file(&self, path: &Path) -> LintResult {
        let start = Instant::now();
        let mut result = match Document::from_path(path) {
            Ok(document) => {
                let (evaluation, timings) = self.evaluate_with_timings(&document);
                LintResult::single(path.to_path_buf(), evaluation, timings)
            }
            Err(e) => {
                log::warn!("Failed to load {}: {}", path.display(), e);
                let diagnostic = Diagnostic::engine(
                    "parse-error",
                    &format!("failed to load document: {}", e),
                    NodePath::root(),
                )
                .with_file(path);
                LintResult::single(
                    path.to_path_buf(),
                    EvaluationResult::new(vec![diagnostic]),
                    Vec::new(),
                )
            }
        };
        result.duration = start.elapsed();
        result
    }

    /// Lint many files concurrently; per-file results keep input order
    pub fn lint_files(&self, files: &[PathBuf]) -> LintResult {
        let start = Instant::now();

        let results: Vec<LintResult> = if self.config.engine.parallel && files.len() > 1 {
            let jobs = if self.config.engine.jobs > 0 {
                self.config.engine.jobs
            } else {
                num_cpus::get()
            };
            log::debug!("Linting {} files with {} jobs", files.len(), jobs);

            match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => pool.install(|| files.par_iter().map(|f| self.lint_file(f)).collect()),
                Err(e) => {
                    log::warn!("Failed to build thread pool, linting sequentially: {}", e);
                    files.iter().map(|f| self.lint_file(f)).collect()
                }
            }
        } else {
            files.iter().map(|f| self.lint_file(f)).collect()
        };

        let mut combined = LintResult::default();
        for result in results {
            combined.merge(result);
        }
        if let Some(threshold) = self.config.output.min_severity {
            combined.retain_min_severity(threshold);
        }

        combined.duration = start.elapsed();
        combined
    }
}

/// Apply one check to one match and turn violations into diagnostics
fn run_check(
    rule: &Rule,
    check: &Check,
    m: &Match<'_>,
    document: &Document,
    severity: Severity,
) -> Result<Vec<Diagnostic>, String> {
    let key_node;
    let (value, target_path): (Option<&Node>, NodePath) = match &check.field {
        None => (Some(m.node), m.path.clone()),
        Some(Field::Key) => {
            key_node = m.path.last().map(|segment| match segment {
                PathSegment::Key(key) => Node::String(key.clone()),
                PathSegment::Index(index) => Node::Number(serde_json::Number::from(*index as u64)),
            });
            (key_node.as_ref(), m.path.clone())
        }
        Some(Field::Path(keys)) => match m.node.get_path(keys) {
            Some(found) => (
                Some(found),
                m.path.join(&keys.iter().map(String::as_str).collect::<NodePath>()),
            ),
            None => (None, m.path.clone()),
        },
    };

    let input = CheckInput {
        value,
        path: &target_path,
        given: m.node,
        given_path: &m.path,
        document,
    };
    let violations = check.predicate.evaluate(&input).map_err(|e| e.to_string())?;

    Ok(violations
        .into_iter()
        .map(|violation| {
            let path = match &violation.path {
                Some(relative) => target_path.join(relative),
                None => target_path.clone(),
            };
            let property = path.last().map(|segment| match segment {
                PathSegment::Key(key) => key.clone(),
                PathSegment::Index(index) => index.to_string(),
            });
            let context = MessageContext {
                error: &violation.message,
                property: property.as_deref(),
                value: value.map(|v| v.scalar_text().unwrap_or_else(|| v.to_string())),
                path: path.to_string(),
            };

            let mut diagnostic =
                Diagnostic::new(rule.code(), severity, &rule.render_message(&context), path);
            if let Some(description) = rule.description() {
                diagnostic = diagnostic.with_help(description);
            }
            if let Some(docs) = rule.docs() {
                diagnostic = diagnostic.with_note(&format!("see {}", docs));
            }
            if let Some(source) = document.source() {
                diagnostic = diagnostic.with_file(source);
            }
            diagnostic
        })
        .collect())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}
