//! Rule catalogs
//!
//! A catalog is an ordered, immutable set of compiled rules. Catalogs are read from
//! YAML (a built-in name such as `sps:naming`, or a file path) and may extend other
//! catalogs. Inheritance is resolved once at load time:
//!
//! - parents listed in `extends` resolve first, left to right
//! - a rule whose code already exists replaces the inherited rule in place
//! - new codes append in definition order
//! - `overrides` toggle or re-severity rules by code
//!
//! Any failure rejects the whole catalog.

use crate::diagnostic::Severity;
use crate::predicates::PredicateRegistry;
use crate::rule::{OneOrMany, Rule, RuleDefinition, RuleError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum `extends` nesting
pub const MAX_EXTENDS_DEPTH: usize = 10;

/// Catalogs compiled into the binary, in listing order
const BUILTIN: &[(&str, &str)] = &[
    ("sps", include_str!("../rulesets/sps.yaml")),
    ("sps:naming", include_str!("../rulesets/sps-naming.yaml")),
    ("sps:url-structure", include_str!("../rulesets/sps-url-structure.yaml")),
    ("sps:collections", include_str!("../rulesets/sps-collections.yaml")),
    ("sps:request-response", include_str!("../rulesets/sps-request-response.yaml")),
    ("sps:serialization", include_str!("../rulesets/sps-serialization.yaml")),
    ("sps:authentication", include_str!("../rulesets/sps-authentication.yaml")),
    ("sps:webhooks", include_str!("../rulesets/sps-webhooks.yaml")),
    ("sps:errors", include_str!("../rulesets/sps-errors.yaml")),
    ("sps:specification", include_str!("../rulesets/sps-specification.yaml")),
    ("sps:general", include_str!("../rulesets/sps-general.yaml")),
    ("oas:recommended", include_str!("../rulesets/oas-recommended.yaml")),
];

/// Names of the built-in catalogs
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|(name, _)| *name)
}

fn builtin_source(name: &str) -> Option<&'static str> {
    BUILTIN
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, source)| *source)
}

/// Catalog loading errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse catalog {origin}: {source}")]
    Parse {
        origin: String,
        source: serde_yaml::Error,
    },

    #[error("unknown catalog '{0}'")]
    Unknown(String),

    #[error("rule '{code}' in {origin}: {source}")]
    Rule {
        origin: String,
        code: String,
        source: RuleError,
    },

    #[error("duplicate rule code '{code}' in {origin}")]
    DuplicateCode { origin: String, code: String },

    #[error("override for unknown rule '{code}' in {origin}")]
    UnknownOverride { origin: String, code: String },

    #[error("invalid override '{value}' for rule '{code}' in {origin}")]
    InvalidOverride {
        origin: String,
        code: String,
        value: String,
    },

    #[error("catalog inheritance cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("catalog '{0}' exceeds the maximum inheritance depth of {MAX_EXTENDS_DEPTH}")]
    TooDeep(String),
}

/// Per-rule adjustment applied after inheritance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleSetting {
    Toggle(bool),
    Text(String),
}

/// What an override does to a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideAction {
    Enable,
    Disable,
    Severity(Severity),
}

impl RuleSetting {
    pub fn action(&self) -> Option<OverrideAction> {
        match self {
            RuleSetting::Toggle(true) => Some(OverrideAction::Enable),
            RuleSetting::Toggle(false) => Some(OverrideAction::Disable),
            RuleSetting::Text(text) => match text.trim().to_lowercase().as_str() {
                "on" | "true" => Some(OverrideAction::Enable),
                "off" | "false" => Some(OverrideAction::Disable),
                other => other.parse().ok().map(OverrideAction::Severity),
            },
        }
    }
}

impl std::fmt::Display for RuleSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleSetting::Toggle(value) => write!(f, "{}", value),
            RuleSetting::Text(text) => write!(f, "{}", text),
        }
    }
}

/// Declarative catalog as written in YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogDefinition {
    pub name: Option<String>,

    pub description: Option<String>,

    /// Parent catalogs (built-in names or paths relative to this file)
    pub extends: OneOrMany<String>,

    pub rules: Vec<RuleDefinition>,

    /// Rule code -> `on` / `off` / severity
    pub overrides: BTreeMap<String, RuleSetting>,
}

/// An immutable, ordered rule set
#[derive(Debug)]
pub struct Catalog {
    name: String,
    description: Option<String>,
    rules: Vec<Rule>,
}

impl Catalog {
    /// Catalog from already compiled rules
    pub fn from_rules(name: &str, rules: Vec<Rule>) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            rules,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// All rules in catalog order, including disabled ones
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn enabled_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|rule| rule.is_enabled())
    }

    pub fn get(&self, code: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.code() == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(Rule::code)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn into_rules(self) -> Vec<Rule> {
        self.rules
    }
}

/// Insert a rule, replacing an existing rule with the same code in place
fn merge_rule(rules: &mut Vec<Rule>, rule: Rule) {
    match rules.iter().position(|existing| existing.code() == rule.code()) {
        Some(index) => rules[index] = rule,
        None => rules.push(rule),
    }
}

/// Resolves catalog references into compiled catalogs
#[derive(Debug, Clone, Default)]
pub struct CatalogLoader {
    registry: PredicateRegistry,
}

impl CatalogLoader {
    /// Loader using the built-in predicates
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: PredicateRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PredicateRegistry {
        &self.registry
    }

    /// Load a built-in catalog by name, or a catalog file by path
    pub fn load(&self, reference: &str) -> Result<Catalog, CatalogError> {
        self.resolve(reference, None, &mut Vec::new())
    }

    pub fn load_file(&self, path: &Path) -> Result<Catalog, CatalogError> {
        self.resolve_file(path, &mut Vec::new())
    }

    /// Load catalog YAML; relative `extends` resolve against the working directory
    pub fn load_str(&self, content: &str) -> Result<Catalog, CatalogError> {
        let definition = parse_definition(content, "<inline>")?;
        self.build(definition, "<inline>", None, &mut Vec::new())
    }

    pub fn from_definition(&self, definition: CatalogDefinition) -> Result<Catalog, CatalogError> {
        self.build(definition, "<definition>", None, &mut Vec::new())
    }

    fn resolve(
        &self,
        reference: &str,
        base_dir: Option<&Path>,
        chain: &mut Vec<String>,
    ) -> Result<Catalog, CatalogError> {
        if let Some(source) = builtin_source(reference) {
            enter(reference.to_string(), chain)?;
            let definition = parse_definition(source, reference)?;
            let catalog = self.build(definition, reference, None, chain);
            chain.pop();
            return catalog.map(|mut catalog| {
                if catalog.name.is_empty() {
                    catalog.name = reference.to_string();
                }
                catalog
            });
        }

        let path = match base_dir {
            Some(dir) if Path::new(reference).is_relative() => dir.join(reference),
            _ => PathBuf::from(reference),
        };
        if !path.exists() && reference.contains(':') {
            return Err(CatalogError::Unknown(reference.to_string()));
        }
        self.resolve_file(&path, chain)
    }

    fn resolve_file(&self, path: &Path, chain: &mut Vec<String>) -> Result<Catalog, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let identity = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf())
            .display()
            .to_string();
        let origin = path.display().to_string();

        enter(identity, chain)?;
        log::debug!("Loading catalog file {}", origin);
        let result = parse_definition(&content, &origin)
            .and_then(|definition| self.build(definition, &origin, path.parent(), chain));
        chain.pop();
        result
    }

    fn build(
        &self,
        definition: CatalogDefinition,
        origin: &str,
        base_dir: Option<&Path>,
        chain: &mut Vec<String>,
    ) -> Result<Catalog, CatalogError> {
        let mut rules: Vec<Rule> = Vec::new();

        for parent in definition.extends.as_slice() {
            let parent = self.resolve(parent, base_dir, chain)?;
            for rule in parent.into_rules() {
                merge_rule(&mut rules, rule);
            }
        }

        let mut seen = HashSet::new();
        for rule in definition.rules {
            if !seen.insert(rule.id.clone()) {
                return Err(CatalogError::DuplicateCode {
                    origin: origin.to_string(),
                    code: rule.id,
                });
            }
            let code = rule.id.clone();
            let rule = Rule::compile(rule, &self.registry).map_err(|source| CatalogError::Rule {
                origin: origin.to_string(),
                code,
                source,
            })?;
            merge_rule(&mut rules, rule);
        }

        for (code, setting) in &definition.overrides {
            let rule = rules
                .iter_mut()
                .find(|rule| rule.code() == code)
                .ok_or_else(|| CatalogError::UnknownOverride {
                    origin: origin.to_string(),
                    code: code.clone(),
                })?;
            match setting.action() {
                Some(OverrideAction::Enable) => rule.set_enabled(true),
                Some(OverrideAction::Disable) => rule.set_enabled(false),
                Some(OverrideAction::Severity(severity)) => {
                    rule.set_enabled(true);
                    rule.set_severity(severity);
                }
                None => {
                    return Err(CatalogError::InvalidOverride {
                        origin: origin.to_string(),
                        code: code.clone(),
                        value: setting.to_string(),
                    })
                }
            }
        }

        log::debug!("Catalog {} resolved with {} rules", origin, rules.len());
        Ok(Catalog {
            name: definition.name.unwrap_or_default(),
            description: definition.description,
            rules,
        })
    }
}

fn parse_definition(content: &str, origin: &str) -> Result<CatalogDefinition, CatalogError> {
    serde_yaml::from_str(content).map_err(|source| CatalogError::Parse {
        origin: origin.to_string(),
        source,
    })
}

/// Record a catalog on the resolution chain, rejecting cycles and deep nesting
fn enter(identity: String, chain: &mut Vec<String>) -> Result<(), CatalogError> {
    if chain.contains(&identity) {
        let mut cycle = chain.clone();
        cycle.push(identity);
        return Err(CatalogError::Cycle(cycle));
    }
    if chain.len() >= MAX_EXTENDS_DEPTH {
        return Err(CatalogError::TooDeep(identity));
    }
    chain.push(identity);
    Ok(())
}
