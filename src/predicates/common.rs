//! General-purpose predicates: presence, truthiness, equality, regex, sets and sizes

use super::{boxed, compile, no_options, parse_options, CheckInput, Outcome, Predicate, Violation};
use crate::document::{Node, NodePath, PathSegment};
use regex::Regex;
use serde::Deserialize;

fn describe(input: &CheckInput<'_>) -> String {
    match input.value {
        Some(node) => node.to_string(),
        None => input
            .path
            .last_key()
            .map(|k| format!("'{}'", k))
            .unwrap_or_else(|| "value".to_string()),
    }
}

/// Value must be truthy; a missing value fails
#[derive(Debug)]
pub struct Truthy;

impl Predicate for Truthy {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        Ok(match input.value {
            Some(node) if node.is_truthy() => vec![],
            Some(node) => vec![Violation::new(format!("{} is not truthy", node))],
            None => vec![Violation::new("value is missing")],
        })
    }
}

pub fn truthy(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    no_options(options)?;
    boxed(Truthy)
}

/// Value must be falsy when present
#[derive(Debug)]
pub struct Falsy;

impl Predicate for Falsy {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        Ok(match input.value {
            Some(node) if node.is_truthy() => vec![Violation::new(format!("{} is not falsy", node))],
            _ => vec![],
        })
    }
}

pub fn falsy(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    no_options(options)?;
    boxed(Falsy)
}

#[derive(Debug)]
pub struct Defined;

impl Predicate for Defined {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        Ok(match input.value {
            Some(_) => vec![],
            None => vec![Violation::new(format!("{} must be defined", describe(input)))],
        })
    }
}

pub fn defined(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    no_options(options)?;
    boxed(Defined)
}

/// Any present value is a violation
#[derive(Debug)]
pub struct Undefined;

impl Predicate for Undefined {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        Ok(match input.value {
            Some(_) => vec![Violation::new(format!(
                "{} must not be defined",
                input
                    .path
                    .last_key()
                    .map(|k| format!("'{}'", k))
                    .unwrap_or_else(|| "value".to_string())
            ))],
            None => vec![],
        })
    }
}

pub fn undefined(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    no_options(options)?;
    boxed(Undefined)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EqualsOptions {
    value: serde_yaml::Value,
}

/// Scalar equality against a fixed value; a missing value fails
#[derive(Debug)]
pub struct Equals {
    expected: Node,
}

impl Predicate for Equals {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        Ok(match input.value {
            Some(node) if node.scalar_eq(&self.expected) => vec![],
            Some(node) => vec![Violation::new(format!(
                "{} must be {}",
                node, self.expected
            ))],
            None => vec![Violation::new(format!(
                "{} must be {}",
                describe(input),
                self.expected
            ))],
        })
    }
}

pub fn equals(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: EqualsOptions = parse_options(options)?;
    let expected = Node::from_yaml_value(options.value).map_err(|e| e.to_string())?;
    if !expected.is_scalar() {
        return Err("'value' must be a scalar".to_string());
    }
    boxed(Equals { expected })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct PatternOptions {
    #[serde(rename = "match")]
    must_match: Option<String>,
    not_match: Option<String>,
}

/// Regex checks on a scalar's string form
#[derive(Debug)]
pub struct Pattern {
    must_match: Option<Regex>,
    not_match: Option<Regex>,
}

impl Predicate for Pattern {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let Some(text) = input.value.and_then(Node::scalar_text) else {
            return Ok(vec![]);
        };

        let mut violations = Vec::new();
        if let Some(regex) = &self.must_match {
            if !regex.is_match(&text) {
                violations.push(Violation::new(format!(
                    "'{}' must match the pattern '{}'",
                    text,
                    regex.as_str()
                )));
            }
        }
        if let Some(regex) = &self.not_match {
            if regex.is_match(&text) {
                violations.push(Violation::new(format!(
                    "'{}' must not match the pattern '{}'",
                    text,
                    regex.as_str()
                )));
            }
        }
        Ok(violations)
    }
}

pub fn pattern(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: PatternOptions = parse_options(options)?;
    if options.must_match.is_none() && options.not_match.is_none() {
        return Err("at least one of 'match' or 'notMatch' is required".to_string());
    }
    boxed(Pattern {
        must_match: options.must_match.as_deref().map(compile).transpose()?,
        not_match: options.not_match.as_deref().map(compile).transpose()?,
    })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct EnumerationOptions {
    values: Vec<serde_yaml::Value>,
    #[serde(default)]
    case_insensitive: bool,
}

/// Scalar must be one of a fixed set
#[derive(Debug)]
pub struct Enumeration {
    values: Vec<String>,
    case_insensitive: bool,
}

impl Predicate for Enumeration {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let Some(text) = input.value.and_then(Node::scalar_text) else {
            return Ok(vec![]);
        };

        let found = self.values.iter().any(|v| {
            if self.case_insensitive {
                v.eq_ignore_ascii_case(&text)
            } else {
                *v == text
            }
        });

        Ok(if found {
            vec![]
        } else {
            vec![Violation::new(format!(
                "'{}' must be one of: {}",
                text,
                self.values.join(", ")
            ))]
        })
    }
}

pub fn enumeration(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: EnumerationOptions = parse_options(options)?;
    let values = options
        .values
        .into_iter()
        .map(|v| {
            Node::from_yaml_value(v)
                .ok()
                .and_then(|n| n.scalar_text())
                .ok_or_else(|| "'values' must only contain scalars".to_string())
        })
        .collect::<Result<Vec<_>, _>>()?;
    boxed(Enumeration {
        values,
        case_insensitive: options.case_insensitive,
    })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LengthOptions {
    min: Option<usize>,
    max: Option<usize>,
}

/// Size bounds: characters of a string, items of a sequence, entries of a mapping
#[derive(Debug)]
pub struct Length {
    min: Option<usize>,
    max: Option<usize>,
}

impl Predicate for Length {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let size = match input.value {
            Some(Node::String(s)) => s.chars().count(),
            Some(Node::Sequence(items)) => items.len(),
            Some(Node::Mapping(entries)) => entries.len(),
            Some(Node::Number(n)) => n.to_string().chars().count(),
            _ => return Ok(vec![]),
        };

        let mut violations = Vec::new();
        if let Some(min) = self.min {
            if size < min {
                violations.push(Violation::new(format!(
                    "length {} is below the minimum of {}",
                    size, min
                )));
            }
        }
        if let Some(max) = self.max {
            if size > max {
                violations.push(Violation::new(format!(
                    "length {} exceeds the maximum of {}",
                    size, max
                )));
            }
        }
        Ok(violations)
    }
}

pub fn length(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: LengthOptions = parse_options(options)?;
    match (options.min, options.max) {
        (None, None) => return Err("at least one of 'min' or 'max' is required".to_string()),
        (Some(min), Some(max)) if min > max => {
            return Err(format!("'min' ({}) is greater than 'max' ({})", min, max))
        }
        _ => {}
    }
    boxed(Length {
        min: options.min,
        max: options.max,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct KeysOptions {
    #[serde(default)]
    allowed: Vec<String>,
    allowed_pattern: Option<String>,
    #[serde(default)]
    required: Vec<String>,
    required_pattern: Option<String>,
    #[serde(default)]
    forbidden: Vec<String>,
    forbidden_pattern: Option<String>,
}

/// Checks on the key set of a mapping
///
/// Unexpected and forbidden keys are reported at the key itself, one violation each;
/// missing required keys are reported at the mapping.
#[derive(Debug)]
pub struct Keys {
    allowed: Vec<String>,
    allowed_pattern: Option<Regex>,
    required: Vec<String>,
    required_pattern: Option<Regex>,
    forbidden: Vec<String>,
    forbidden_pattern: Option<Regex>,
}

impl Keys {
    fn restricts_allowed(&self) -> bool {
        !self.allowed.is_empty() || self.allowed_pattern.is_some()
    }

    fn is_allowed(&self, key: &str) -> bool {
        self.allowed.iter().any(|a| a == key)
            || self
                .allowed_pattern
                .as_ref()
                .is_some_and(|r| r.is_match(key))
    }

    fn is_forbidden(&self, key: &str) -> bool {
        self.forbidden.iter().any(|f| f == key)
            || self
                .forbidden_pattern
                .as_ref()
                .is_some_and(|r| r.is_match(key))
    }
}

impl Predicate for Keys {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let Some(entries) = input.value.and_then(Node::as_mapping) else {
            return Ok(vec![]);
        };

        let mut violations = Vec::new();
        for (key, _) in entries {
            let at: NodePath = vec![PathSegment::Key(key.clone())].into_iter().collect();
            if self.restricts_allowed() && !self.is_allowed(key) {
                violations.push(Violation::new(format!("'{}' is not an allowed key", key)).at(at));
            } else if self.is_forbidden(key) {
                violations.push(Violation::new(format!("'{}' is a forbidden key", key)).at(at));
            }
        }

        let missing: Vec<&str> = self
            .required
            .iter()
            .filter(|r| !entries.iter().any(|(k, _)| k == *r))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            violations.push(Violation::new(format!(
                "missing required key(s): {}",
                missing.join(", ")
            )));
        }

        if let Some(regex) = &self.required_pattern {
            if !entries.iter().any(|(k, _)| regex.is_match(k)) {
                violations.push(Violation::new(format!(
                    "no key matches the pattern '{}'",
                    regex.as_str()
                )));
            }
        }

        Ok(violations)
    }
}

pub fn keys(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: KeysOptions = parse_options(options)?;
    boxed(Keys {
        allowed: options.allowed,
        allowed_pattern: options.allowed_pattern.as_deref().map(compile).transpose()?,
        required: options.required,
        required_pattern: options.required_pattern.as_deref().map(compile).transpose()?,
        forbidden: options.forbidden,
        forbidden_pattern: options.forbidden_pattern.as_deref().map(compile).transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::{options, run, run_text};
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_truthy_and_missing() {
        let p = truthy(&serde_yaml::Value::Null).unwrap();
        assert!(run(p.as_ref(), "security: [{a: []}]", "security").is_empty());
        assert_eq!(run(p.as_ref(), "security: false", "security").len(), 1);
        assert_eq!(run(p.as_ref(), "info: {}", "security").len(), 1);
    }

    #[test]
    fn test_falsy_ignores_missing() {
        let p = falsy(&serde_yaml::Value::Null).unwrap();
        assert!(run(p.as_ref(), "other: 1", "required").is_empty());
        assert!(run(p.as_ref(), "required: false", "required").is_empty());
        assert_eq!(run(p.as_ref(), "required: true", "required").len(), 1);
    }

    #[test]
    fn test_defined_undefined() {
        let d = defined(&serde_yaml::Value::Null).unwrap();
        let u = undefined(&serde_yaml::Value::Null).unwrap();
        assert!(run(d.as_ref(), "requestBody: {}", "requestBody").is_empty());
        assert_eq!(run(d.as_ref(), "x: 1", "requestBody").len(), 1);
        assert_eq!(run(u.as_ref(), "requestBody: {}", "requestBody").len(), 1);
        assert!(run(u.as_ref(), "x: 1", "requestBody").is_empty());
    }

    #[test]
    fn test_equals() {
        let p = equals(&options("value: string")).unwrap();
        assert!(run(p.as_ref(), "type: string", "type").is_empty());
        assert_eq!(run(p.as_ref(), "type: number", "type").len(), 1);
        assert_eq!(run(p.as_ref(), "format: x", "type").len(), 1);

        let p = equals(&options("value: true")).unwrap();
        assert!(run(p.as_ref(), "x-internal: true", "x-internal").is_empty());
        assert_eq!(run(p.as_ref(), "x-internal: 'true'", "x-internal").len(), 1);
    }

    #[test]
    fn test_equals_requires_scalar() {
        assert!(equals(&options("value: [1]")).is_err());
        assert!(equals(&serde_yaml::Value::Null).is_err());
    }

    #[test]
    fn test_pattern() {
        let p = pattern(&options(r"match: '^\d+\.\d+\.\d+$'")).unwrap();
        assert!(run_text(p.as_ref(), "1.2.3").is_empty());
        assert_eq!(run_text(p.as_ref(), "abc").len(), 1);

        let p = pattern(&options("notMatch: '//'")).unwrap();
        assert!(run_text(p.as_ref(), "/a/b").is_empty());
        assert_eq!(run_text(p.as_ref(), "/a//b").len(), 1);
    }

    #[test]
    fn test_pattern_checks_number_text() {
        let p = pattern(&options(r"match: '^\d+\.\d+\.\d+$'")).unwrap();
        assert_eq!(run(p.as_ref(), "version: 1.0", "version").len(), 1);
    }

    #[test]
    fn test_pattern_options() {
        assert!(pattern(&serde_yaml::Value::Null).is_err());
        assert!(pattern(&options("match: '('")).is_err());
    }

    #[test]
    fn test_enumeration() {
        let p = enumeration(&options("values: [get, post]\ncaseInsensitive: true")).unwrap();
        assert!(run_text(p.as_ref(), "GET").is_empty());
        assert_eq!(run_text(p.as_ref(), "trace").len(), 1);
    }

    #[test]
    fn test_length() {
        let p = length(&options("max: 5")).unwrap();
        assert!(run_text(p.as_ref(), "abcde").is_empty());
        assert_eq!(run_text(p.as_ref(), "abcdef").len(), 1);
        assert!(run(p.as_ref(), "a: [1, 2]", "a").is_empty());

        assert!(length(&options("min: 3\nmax: 1")).is_err());
        assert!(length(&serde_yaml::Value::Null).is_err());
    }

    #[test]
    fn test_keys_allowed_reports_each_key() {
        let p = keys(&options("allowed: [get, post]\nallowedPattern: '^x-'")).unwrap();
        let violations = run(p.as_ref(), "item:\n  get: {}\n  x-extra: 1\n  fetch: {}\n  grab: {}\n", "item");
        assert_eq!(violations.len(), 2);
        assert_eq!(
            violations[0].path,
            Some(vec![PathSegment::from("fetch")].into_iter().collect())
        );
    }

    #[test]
    fn test_keys_required() {
        let p = keys(&options("required: ['200', '500']")).unwrap();
        let violations = run(p.as_ref(), "responses:\n  '200': {}\n", "responses");
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("500"));

        let p = keys(&options(r"requiredPattern: '^2\d\d$'")).unwrap();
        assert!(run(p.as_ref(), "responses:\n  '204': {}\n", "responses").is_empty());
        assert_eq!(run(p.as_ref(), "responses:\n  '404': {}\n", "responses").len(), 1);
    }
}
