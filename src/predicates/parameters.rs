//! Operation parameter checks
//!
//! These predicates run on an operation object. Parameters declared on the
//! enclosing path item are included unless the operation redeclares them, and
//! local `$ref`s are followed.

use super::{boxed, parse_options, CheckInput, Outcome, Predicate, Violation};
use crate::document::Node;
use serde::Deserialize;

/// `(name, in)` of a parameter object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterRef<'a> {
    pub name: &'a str,
    pub location: &'a str,
}

fn parameter_list<'a>(node: Option<&'a Node>, input: &CheckInput<'a>) -> Vec<ParameterRef<'a>> {
    let Some(items) = node.and_then(Node::as_sequence) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let item = match item.get("$ref").and_then(Node::as_str) {
                Some(pointer) => input.document.resolve_pointer(pointer)?,
                None => item,
            };
            Some(ParameterRef {
                name: item.get("name")?.as_str()?,
                location: item.get("in")?.as_str()?,
            })
        })
        .collect()
}

/// Effective parameters of the operation under check
pub fn operation_parameters<'a>(input: &CheckInput<'a>) -> Vec<ParameterRef<'a>> {
    let Some(operation) = input.value else {
        return Vec::new();
    };

    let mut parameters = parameter_list(operation.get("parameters"), input);

    let path_item = input
        .path
        .parent()
        .and_then(|parent| input.document.resolve(&parent));
    if let Some(path_item) = path_item {
        for inherited in parameter_list(path_item.get("parameters"), input) {
            if !parameters.contains(&inherited) {
                parameters.push(inherited);
            }
        }
    }

    parameters
}

fn in_query() -> String {
    "query".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParameterCountOptions {
    #[serde(rename = "in", default = "in_query")]
    location: String,
    max: usize,
}

/// Too many parameters in one location
#[derive(Debug)]
pub struct ParameterCount {
    location: String,
    max: usize,
}

impl Predicate for ParameterCount {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let count = operation_parameters(input)
            .iter()
            .filter(|p| p.location == self.location)
            .count();

        Ok(if count > self.max {
            vec![Violation::new(format!(
                "operation has {} {} parameters, more than {}",
                count, self.location, self.max
            ))]
        } else {
            vec![]
        })
    }
}

pub fn parameter_count(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: ParameterCountOptions = parse_options(options)?;
    boxed(ParameterCount {
        location: options.location,
        max: options.max,
    })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RequiredParametersOptions {
    #[serde(rename = "in", default = "in_query")]
    location: String,
    names: Vec<String>,
}

/// Operation must declare every listed parameter
#[derive(Debug)]
pub struct RequiredParameters {
    location: String,
    names: Vec<String>,
}

impl Predicate for RequiredParameters {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        if input.value.is_none() {
            return Ok(vec![]);
        }
        let declared = operation_parameters(input);

        let missing: Vec<&str> = self
            .names
            .iter()
            .filter(|name| {
                !declared
                    .iter()
                    .any(|p| p.location == self.location && p.name == name.as_str())
            })
            .map(String::as_str)
            .collect();

        Ok(if missing.is_empty() {
            vec![]
        } else {
            vec![Violation::new(format!(
                "operation is missing {} parameter(s): {}",
                self.location,
                missing.join(", ")
            ))]
        })
    }
}

pub fn required_parameters(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: RequiredParametersOptions = parse_options(options)?;
    if options.names.is_empty() {
        return Err("'names' must not be empty".to_string());
    }
    boxed(RequiredParameters {
        location: options.location,
        names: options.names,
    })
}

fn default_root() -> String {
    "filter".to_string()
}

fn default_suffix() -> String {
    "Filter".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct FilterExclusivityOptions {
    #[serde(default = "default_root")]
    root: String,
    #[serde(default = "default_suffix")]
    hybrid_suffix: String,
}

/// A root filter parameter may not be combined with per-field `*Filter` parameters
#[derive(Debug)]
pub struct FilterExclusivity {
    root: String,
    hybrid_suffix: String,
}

impl Predicate for FilterExclusivity {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let query: Vec<ParameterRef<'_>> = operation_parameters(input)
            .into_iter()
            .filter(|p| p.location == "query")
            .collect();

        if !query.iter().any(|p| p.name == self.root) {
            return Ok(vec![]);
        }

        let hybrids: Vec<&str> = query
            .iter()
            .filter(|p| p.name != self.root && p.name.ends_with(&self.hybrid_suffix))
            .map(|p| p.name)
            .collect();

        Ok(if hybrids.is_empty() {
            vec![]
        } else {
            vec![Violation::new(format!(
                "'{}' cannot be combined with {}",
                self.root,
                hybrids.join(", ")
            ))]
        })
    }
}

pub fn filter_exclusivity(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: FilterExclusivityOptions = parse_options(options)?;
    boxed(FilterExclusivity {
        root: options.root,
        hybrid_suffix: options.hybrid_suffix,
    })
}
