//! Rule definitions and compiled rules
//!
//! A [`RuleDefinition`] is the declarative form read from catalog files. Compiling it
//! parses every selector and binds every check to a predicate from the registry,
//! producing a [`Rule`] that is ready to evaluate.

use crate::diagnostic::Severity;
use crate::predicates::{Predicate, PredicateError, PredicateRegistry};
use crate::selector::{Selector, SelectorError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors raised while compiling a rule
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("invalid selector '{selector}': {source}")]
    Selector {
        selector: String,
        source: SelectorError,
    },

    #[error("check {index}: {source}")]
    Predicate {
        index: usize,
        source: PredicateError,
    },

    #[error("invalid field '{field}': {reason}")]
    Field { field: String, reason: String },

    #[error("{0}")]
    Invalid(String),
}

/// A single value or a list of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item),
            OneOrMany::Many(items) => items,
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

/// One `then` entry: which field to check and with which predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckDefinition {
    /// `@key` for the matched key, or a dotted path below the matched node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    /// Predicate name in the registry
    pub function: String,

    #[serde(default, skip_serializing_if = "serde_yaml::Value::is_null")]
    pub options: serde_yaml::Value,
}

/// Declarative rule as written in a catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Unique rule code (e.g., "sps-camel-case-properties")
    #[serde(alias = "code")]
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Message template; supports `{error}`, `{property}`, `{value}`, `{path}`
    /// and `{description}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default)]
    pub severity: Severity,

    /// Selector(s) for the nodes this rule inspects
    pub given: OneOrMany<String>,

    /// Check(s) applied to every selected node
    pub then: OneOrMany<CheckDefinition>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Documentation URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl RuleDefinition {
    /// Rule with one selector and one check
    pub fn new(id: &str, given: &str, function: &str) -> Self {
        Self {
            id: id.to_string(),
            description: None,
            message: None,
            severity: Severity::default(),
            given: OneOrMany::One(given.to_string()),
            then: OneOrMany::One(CheckDefinition {
                field: None,
                function: function.to_string(),
                options: serde_yaml::Value::Null,
            }),
            tags: Vec::new(),
            docs: None,
            enabled: true,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    /// Set the field of every check
    pub fn with_field(mut self, field: &str) -> Self {
        self.then = OneOrMany::Many(
            self.then
                .as_slice()
                .iter()
                .cloned()
                .map(|mut check| {
                    check.field = Some(field.to_string());
                    check
                })
                .collect(),
        );
        self
    }

    /// Set the options of every check from YAML text
    pub fn with_options(mut self, options: serde_yaml::Value) -> Self {
        self.then = OneOrMany::Many(
            self.then
                .as_slice()
                .iter()
                .cloned()
                .map(|mut check| {
                    check.options = options.clone();
                    check
                })
                .collect(),
        );
        self
    }

    /// Add another check
    pub fn with_check(mut self, check: CheckDefinition) -> Self {
        let mut checks = self.then.as_slice().to_vec();
        checks.push(check);
        self.then = OneOrMany::Many(checks);
        self
    }
}

/// What a check looks at relative to the selected node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// The key (or index) of the selected node
    Key,
    /// A path of keys below the selected node
    Path(Vec<String>),
}

impl FromStr for Field {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed == "@key" {
            return Ok(Field::Key);
        }
        let keys: Vec<String> = trimmed.split('.').map(str::to_string).collect();
        if keys.iter().any(String::is_empty) {
            return Err(RuleError::Field {
                field: s.to_string(),
                reason: "empty key".to_string(),
            });
        }
        Ok(Field::Path(keys))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Key => write!(f, "@key"),
            Field::Path(keys) => write!(f, "{}", keys.join(".")),
        }
    }
}

/// A check bound to its predicate
#[derive(Debug)]
pub struct Check {
    pub field: Option<Field>,
    pub function: String,
    pub predicate: Box<dyn Predicate>,
}

/// A compiled, ready-to-evaluate rule
#[derive(Debug)]
pub struct Rule {
    definition: RuleDefinition,
    selectors: Vec<Selector>,
    checks: Vec<Check>,
}

impl Rule {
    /// Parse selectors and bind predicates; any failure rejects the rule
    pub fn compile(definition: RuleDefinition, registry: &PredicateRegistry) -> Result<Self, RuleError> {
        if definition.id.trim().is_empty() {
            return Err(RuleError::Invalid("rule id must not be empty".to_string()));
        }
        if definition.given.as_slice().is_empty() {
            return Err(RuleError::Invalid("'given' must list at least one selector".to_string()));
        }
        if definition.then.as_slice().is_empty() {
            return Err(RuleError::Invalid("'then' must list at least one check".to_string()));
        }

        let selectors = definition
            .given
            .as_slice()
            .iter()
            .map(|expr| {
                Selector::parse(expr).map_err(|source| RuleError::Selector {
                    selector: expr.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut checks = Vec::new();
        for (index, check) in definition.then.as_slice().iter().enumerate() {
            let field = check.field.as_deref().map(str::parse::<Field>).transpose()?;
            let predicate = registry
                .create(&check.function, &check.options)
                .map_err(|source| RuleError::Predicate { index, source })?;
            checks.push(Check {
                field,
                function: check.function.clone(),
                predicate,
            });
        }

        Ok(Self {
            definition,
            selectors,
            checks,
        })
    }

    pub fn code(&self) -> &str {
        &self.definition.id
    }

    pub fn severity(&self) -> Severity {
        self.definition.severity
    }

    pub fn is_enabled(&self) -> bool {
        self.definition.enabled
    }

    pub fn description(&self) -> Option<&str> {
        self.definition.description.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.definition.tags
    }

    pub fn docs(&self) -> Option<&str> {
        self.definition.docs.as_deref()
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub fn definition(&self) -> &RuleDefinition {
        &self.definition
    }

    pub(crate) fn set_severity(&mut self, severity: Severity) {
        self.definition.severity = severity;
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.definition.enabled = enabled;
    }

    /// Render the diagnostic message for one violation
    pub fn render_message(&self, context: &MessageContext<'_>) -> String {
        match &self.definition.message {
            Some(template) => format_message(template, context, self.description()),
            None if !context.error.is_empty() => context.error.to_string(),
            None => self
                .description()
                .map(str::to_string)
                .unwrap_or_else(|| self.code().to_string()),
        }
    }
}

/// Values available to message placeholders
#[derive(Debug, Clone, Default)]
pub struct MessageContext<'a> {
    pub error: &'a str,
    pub property: Option<&'a str>,
    pub value: Option<String>,
    pub path: String,
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("valid regex"))
}

/// Substitute `{name}` placeholders; unknown names are left untouched
fn format_message(template: &str, context: &MessageContext<'_>, description: Option<&str>) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &regex::Captures| {
            let name = &caps[1];
            match name {
                "error" => context.error.to_string(),
                "property" => context.property.unwrap_or("").to_string(),
                "value" => context.value.clone().unwrap_or_default(),
                "path" => context.path.clone(),
                "description" => description.unwrap_or("").to_string(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const YAML: &str = r#"
id: semver
description: Version should follow semantic versioning
message: "Version should use semantic versioning. {value} is not a valid version."
severity: warning
given: $.info.version
then:
  function: pattern
  options:
    match: '^\d+\.\d+\.\d+$'
tags: [specification]
"#;

    #[test]
    fn test_definition_from_yaml() {
        let def: RuleDefinition = serde_yaml::from_str(YAML).unwrap();
        assert_eq!(def.id, "semver");
        assert_eq!(def.severity, Severity::Warning);
        assert_eq!(def.given.as_slice(), &["$.info.version".to_string()]);
        assert_eq!(def.then.as_slice()[0].function, "pattern");
        assert!(def.enabled);
    }

    #[test]
    fn test_definition_many() {
        let yaml = r#"
code: two-checks
given: [$.a, $.b]
then:
  - field: type
    function: truthy
  - field: '@key'
    function: casing
    options: { type: camel }
"#;
        let def: RuleDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "two-checks");
        assert_eq!(def.given.as_slice().len(), 2);
        assert_eq!(def.then.as_slice().len(), 2);
        assert_eq!(def.severity, Severity::Warning);
    }

    #[test]
    fn test_compile() {
        let def: RuleDefinition = serde_yaml::from_str(YAML).unwrap();
        let rule = Rule::compile(def, &PredicateRegistry::builtin()).unwrap();
        assert_eq!(rule.code(), "semver");
        assert_eq!(rule.selectors().len(), 1);
        assert_eq!(rule.checks().len(), 1);
        assert_eq!(rule.tags(), &["specification".to_string()]);
    }

    #[test]
    fn test_compile_errors() {
        let registry = PredicateRegistry::builtin();

        let bad_selector = RuleDefinition::new("x", "paths", "truthy");
        assert!(matches!(
            Rule::compile(bad_selector, &registry),
            Err(RuleError::Selector { .. })
        ));

        let unknown = RuleDefinition::new("x", "$.paths", "doesNotExist");
        assert!(matches!(
            Rule::compile(unknown, &registry),
            Err(RuleError::Predicate {
                source: PredicateError::Unknown(_),
                ..
            })
        ));

        let bad_options = RuleDefinition::new("x", "$.paths", "casing")
            .with_options(serde_yaml::from_str("type: shouting").unwrap());
        assert!(matches!(
            Rule::compile(bad_options, &registry),
            Err(RuleError::Predicate {
                source: PredicateError::InvalidOptions { .. },
                ..
            })
        ));

        let bad_field = RuleDefinition::new("x", "$.paths", "truthy").with_field("a..b");
        assert!(matches!(
            Rule::compile(bad_field, &registry),
            Err(RuleError::Field { .. })
        ));

        let no_id = RuleDefinition::new(" ", "$.paths", "truthy");
        assert!(matches!(Rule::compile(no_id, &registry), Err(RuleError::Invalid(_))));
    }

    #[test]
    fn test_field_parse() {
        assert_eq!("@key".parse::<Field>().unwrap(), Field::Key);
        assert_eq!(
            "schema.type".parse::<Field>().unwrap(),
            Field::Path(vec!["schema".to_string(), "type".to_string()])
        );
        assert_eq!(Field::Path(vec!["x-internal".to_string()]).to_string(), "x-internal");
    }

    #[test]
    fn test_render_message() {
        let def: RuleDefinition = serde_yaml::from_str(YAML).unwrap();
        let rule = Rule::compile(def, &PredicateRegistry::builtin()).unwrap();
        let context = MessageContext {
            error: "'abc' must match",
            property: Some("version"),
            value: Some("abc".to_string()),
            path: "$.info.version".to_string(),
        };
        assert_eq!(
            rule.render_message(&context),
            "Version should use semantic versioning. abc is not a valid version."
        );
    }

    #[test]
    fn test_render_placeholders() {
        let context = MessageContext {
            error: "boom",
            property: Some("userID"),
            value: None,
            path: "$.a".to_string(),
        };
        assert_eq!(
            format_message("{property} at {path}: {error} {unknown}", &context, None),
            "userID at $.a: boom {unknown}"
        );
        assert_eq!(
            format_message("{description}", &context, Some("Use camelCase")),
            "Use camelCase"
        );
    }

    #[test]
    fn test_render_without_template() {
        let rule = Rule::compile(
            RuleDefinition::new("x", "$", "truthy").with_description("desc"),
            &PredicateRegistry::builtin(),
        )
        .unwrap();
        let mut context = MessageContext::default();
        assert_eq!(rule.render_message(&context), "desc");
        context.error = "predicate said no";
        assert_eq!(rule.render_message(&context), "predicate said no");
    }
}
