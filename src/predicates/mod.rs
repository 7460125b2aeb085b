//! Predicate library
//!
//! A predicate is a pure check over one selected value. Rules bind predicates by
//! name through a [`PredicateRegistry`]; each factory validates its options when a
//! catalog is loaded, so a bad option never reaches evaluation.
//!
//! Predicates are total: a missing value or a node of the wrong shape passes,
//! except for `defined`, `truthy` and `equals` where absence is the violation.

pub mod casing;
pub mod common;
pub mod parameters;
pub mod schema;
pub mod url;
pub mod words;

use crate::document::{Document, Node, NodePath};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors raised by the registry or by a predicate at runtime
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredicateError {
    #[error("unknown predicate '{0}'")]
    Unknown(String),

    #[error("invalid options for predicate '{name}': {reason}")]
    InvalidOptions { name: String, reason: String },

    #[error("{0}")]
    Failed(String),
}

/// Everything a predicate may look at for one check
#[derive(Debug, Clone, Copy)]
pub struct CheckInput<'a> {
    /// The checked value; `None` when the rule's field is absent
    pub value: Option<&'a Node>,
    /// Location of the checked value
    pub path: &'a NodePath,
    /// Node matched by the rule's selector
    pub given: &'a Node,
    pub given_path: &'a NodePath,
    pub document: &'a Document,
}

impl<'a> CheckInput<'a> {
    /// Key under which the selected node lives
    pub fn property(&self) -> Option<&'a str> {
        self.given_path.last_key()
    }

    /// Checked value as a string, if it is one
    pub fn text(&self) -> Option<&'a str> {
        self.value.and_then(Node::as_str)
    }
}

/// One failure reported by a predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub message: String,
    /// Location relative to the checked value, when narrower than the value itself
    pub path: Option<NodePath>,
}

impl Violation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }

    pub fn at(mut self, path: NodePath) -> Self {
        self.path = Some(path);
        self
    }
}

/// Result of one predicate run; empty means pass
pub type Outcome = Result<Vec<Violation>, PredicateError>;

/// A pure check bound to a rule
pub trait Predicate: Send + Sync + fmt::Debug {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome;
}

/// Builds a predicate from its options
pub type PredicateFactory = fn(&serde_yaml::Value) -> Result<Box<dyn Predicate>, String>;

/// Name to factory lookup
#[derive(Clone)]
pub struct PredicateRegistry {
    factories: BTreeMap<String, PredicateFactory>,
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateRegistry")
            .field("predicates", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for PredicateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PredicateRegistry {
    /// Registry without any predicates
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with every built-in predicate
    pub fn builtin() -> Self {
        let mut registry = Self::empty();

        registry.register("truthy", common::truthy);
        registry.register("falsy", common::falsy);
        registry.register("defined", common::defined);
        registry.register("undefined", common::undefined);
        registry.register("equals", common::equals);
        registry.register("pattern", common::pattern);
        registry.register("enumeration", common::enumeration);
        registry.register("length", common::length);
        registry.register("keys", common::keys);

        registry.register("casing", casing::casing);

        registry.register("disallowedWords", words::disallowed_words);
        registry.register("booleanPrefix", words::boolean_prefix);

        registry.register("schemaShape", schema::schema_shape);
        registry.register("collectionResults", schema::collection_results);
        registry.register("pagingObject", schema::paging_object);
        registry.register("unusedComponents", schema::unused_components);

        registry.register("parameterCount", parameters::parameter_count);
        registry.register("requiredParameters", parameters::required_parameters);
        registry.register("filterExclusivity", parameters::filter_exclusivity);

        registry.register("pathParameterCount", url::path_parameter_count);
        registry.register("pathHierarchy", url::path_hierarchy);
        registry.register("pathSegments", url::path_segments);
        registry.register("httpsOnly", url::https_only);
        registry.register("hostLowercase", url::host_lowercase);
        registry.register("noPort", url::no_port);
        registry.register("hostDomain", url::host_domain);

        registry
    }

    /// Add or replace a predicate
    pub fn register(&mut self, name: &str, factory: PredicateFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Instantiate a predicate with validated options
    pub fn create(
        &self,
        name: &str,
        options: &serde_yaml::Value,
    ) -> Result<Box<dyn Predicate>, PredicateError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| PredicateError::Unknown(name.to_string()))?;

        factory(options).map_err(|reason| PredicateError::InvalidOptions {
            name: name.to_string(),
            reason,
        })
    }
}

/// Deserialize predicate options; absent options become an empty mapping
pub fn parse_options<T: DeserializeOwned>(options: &serde_yaml::Value) -> Result<T, String> {
    let value = if options.is_null() {
        serde_yaml::Value::Mapping(serde_yaml::Mapping::new())
    } else {
        options.clone()
    };
    serde_yaml::from_value(value).map_err(|e| e.to_string())
}

/// Reject any options for predicates that take none
pub fn no_options(options: &serde_yaml::Value) -> Result<(), String> {
    match options {
        serde_yaml::Value::Null => Ok(()),
        serde_yaml::Value::Mapping(map) if map.is_empty() => Ok(()),
        _ => Err("this predicate takes no options".to_string()),
    }
}

pub(crate) fn boxed<P: Predicate + 'static>(predicate: P) -> Result<Box<dyn Predicate>, String> {
    Ok(Box::new(predicate))
}

/// Compile a regex option, reporting the offending pattern
pub(crate) fn compile(pattern: &str) -> Result<regex::Regex, String> {
    regex::Regex::new(pattern).map_err(|e| format!("invalid regex '{}': {}", pattern, e))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers for predicate unit tests

    use super::*;

    /// Run a predicate against `value` found at `$.<key>` inside `yaml`
    pub fn run(predicate: &dyn Predicate, yaml: &str, key: &str) -> Vec<Violation> {
        let document = Document::from_yaml(yaml).unwrap();
        let path: NodePath = vec![crate::document::PathSegment::from(key)]
            .into_iter()
            .collect();
        let value = document.root().get(key);
        let input = CheckInput {
            value,
            path: &path,
            given: value.unwrap_or(document.root()),
            given_path: &path,
            document: &document,
        };
        predicate.evaluate(&input).unwrap()
    }

    /// Run a predicate against a string value
    pub fn run_text(predicate: &dyn Predicate, text: &str) -> Vec<Violation> {
        let document = Document::new(Node::Null);
        let path = NodePath::root();
        let value = Node::String(text.to_string());
        let input = CheckInput {
            value: Some(&value),
            path: &path,
            given: &value,
            given_path: &path,
            document: &document,
        };
        predicate.evaluate(&input).unwrap()
    }

    pub fn options(yaml: &str) -> serde_yaml::Value {
        serde_yaml::from_str(yaml).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_names() {
        let registry = PredicateRegistry::builtin();
        for name in ["truthy", "casing", "pathSegments", "filterExclusivity", "schemaShape"] {
            assert!(registry.contains(name), "missing {}", name);
        }
        assert!(!registry.contains("nope"));
    }

    #[test]
    fn test_unknown_predicate() {
        let registry = PredicateRegistry::builtin();
        let err = registry
            .create("nope", &serde_yaml::Value::Null)
            .unwrap_err();
        assert_eq!(err, PredicateError::Unknown("nope".to_string()));
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let registry = PredicateRegistry::builtin();
        let options = testing::options("type: sarcastic");
        assert!(matches!(
            registry.create("casing", &options),
            Err(PredicateError::InvalidOptions { .. })
        ));

        let options = testing::options("unexpected: 1");
        assert!(matches!(
            registry.create("truthy", &options),
            Err(PredicateError::InvalidOptions { .. })
        ));
    }

    #[test]
    fn test_custom_registration() {
        #[derive(Debug)]
        struct AlwaysFails;

        impl Predicate for AlwaysFails {
            fn evaluate(&self, _input: &CheckInput<'_>) -> Outcome {
                Ok(vec![Violation::new("nope")])
            }
        }

        let mut registry = PredicateRegistry::empty();
        registry.register("alwaysFails", |_| boxed(AlwaysFails));

        let predicate = registry
            .create("alwaysFails", &serde_yaml::Value::Null)
            .unwrap();
        assert_eq!(testing::run_text(predicate.as_ref(), "x").len(), 1);
    }
}
