//! Structural checks on schema objects
//!
//! Schemas that are only a `$ref` are skipped; references are not resolved.

use super::{boxed, parse_options, CheckInput, Outcome, Predicate, Violation};
use crate::document::{Node, NodePath, PathSegment};
use serde::Deserialize;
use std::collections::HashSet;

fn is_reference(node: &Node) -> bool {
    node.get("$ref").is_some()
}

fn type_of(node: &Node) -> Option<&str> {
    node.get("type").and_then(Node::as_str)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaShapeOptions {
    keywords: serde_yaml::Mapping,
}

/// Every listed keyword must carry the expected value; all mismatches are
/// reported together
#[derive(Debug)]
pub struct SchemaShape {
    keywords: Vec<(String, Node)>,
}

impl Predicate for SchemaShape {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let Some(schema) = input.value else {
            return Ok(vec![]);
        };
        if schema.as_mapping().is_none() || is_reference(schema) {
            return Ok(vec![]);
        }

        let mismatches: Vec<String> = self
            .keywords
            .iter()
            .filter_map(|(keyword, expected)| match schema.get(keyword) {
                Some(actual) if actual.scalar_eq(expected) => None,
                Some(actual) => Some(format!("{} is {} (expected {})", keyword, actual, expected)),
                None => Some(format!("{} is missing (expected {})", keyword, expected)),
            })
            .collect();

        Ok(if mismatches.is_empty() {
            vec![]
        } else {
            vec![Violation::new(format!(
                "schema does not match the required shape: {}",
                mismatches.join("; ")
            ))]
        })
    }
}

pub fn schema_shape(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: SchemaShapeOptions = parse_options(options)?;
    if options.keywords.is_empty() {
        return Err("'keywords' must not be empty".to_string());
    }

    let mut keywords = Vec::with_capacity(options.keywords.len());
    for (key, value) in options.keywords {
        let key = key
            .as_str()
            .ok_or_else(|| "keyword names must be strings".to_string())?
            .to_string();
        let value = Node::from_yaml_value(value).map_err(|e| e.to_string())?;
        if !value.is_scalar() {
            return Err(format!("expected value for '{}' must be a scalar", key));
        }
        keywords.push((key, value));
    }
    boxed(SchemaShape { keywords })
}

fn default_results() -> String {
    "results".to_string()
}

fn default_object() -> String {
    "object".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct CollectionResultsOptions {
    #[serde(default = "default_results")]
    property: String,
    #[serde(default = "default_object")]
    items_type: String,
}

/// Collection response schema must expose an array of objects
#[derive(Debug)]
pub struct CollectionResults {
    property: String,
    items_type: String,
}

impl Predicate for CollectionResults {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let Some(schema) = input.value else {
            return Ok(vec![]);
        };
        if schema.as_mapping().is_none() || is_reference(schema) {
            return Ok(vec![]);
        }

        let results = schema.get_path(&["properties", self.property.as_str()]);
        let message = match results {
            None => Some(format!("collection response must define a '{}' array", self.property)),
            Some(results) if is_reference(results) => None,
            Some(results) if type_of(results) != Some("array") => Some(format!(
                "'{}' must be an array, found {}",
                self.property,
                type_of(results).unwrap_or("no type")
            )),
            Some(results) => match results.get("items") {
                Some(items) if is_reference(items) => None,
                Some(items) if type_of(items) == Some(self.items_type.as_str()) => None,
                Some(items) => Some(format!(
                    "'{}' items must be of type {}, found {}",
                    self.property,
                    self.items_type,
                    type_of(items).unwrap_or("no type")
                )),
                None => Some(format!(
                    "'{}' must declare items of type {}",
                    self.property, self.items_type
                )),
            },
        };

        Ok(message.into_iter().map(Violation::new).collect())
    }
}

pub fn collection_results(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: CollectionResultsOptions = parse_options(options)?;
    boxed(CollectionResults {
        property: options.property,
        items_type: options.items_type,
    })
}

fn default_paging() -> String {
    "paging".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PagingObjectOptions {
    #[serde(default = "default_paging")]
    property: String,
    #[serde(default)]
    fields: Vec<String>,
}

/// Collection response schema must carry a paging object
#[derive(Debug)]
pub struct PagingObject {
    property: String,
    fields: Vec<String>,
}

impl Predicate for PagingObject {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let Some(schema) = input.value else {
            return Ok(vec![]);
        };
        if schema.as_mapping().is_none() || is_reference(schema) {
            return Ok(vec![]);
        }

        let paging = match schema.get_path(&["properties", self.property.as_str()]) {
            None => {
                return Ok(vec![Violation::new(format!(
                    "collection response must define a '{}' object",
                    self.property
                ))])
            }
            Some(paging) if is_reference(paging) => return Ok(vec![]),
            Some(paging) => paging,
        };

        if type_of(paging) != Some("object") {
            return Ok(vec![Violation::new(format!(
                "'{}' must be an object, found {}",
                self.property,
                type_of(paging).unwrap_or("no type")
            ))]);
        }

        if let Some(properties) = paging.get("properties") {
            let missing: Vec<&str> = self
                .fields
                .iter()
                .filter(|f| properties.get(f).is_none())
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                return Ok(vec![Violation::new(format!(
                    "'{}' is missing field(s): {}",
                    self.property,
                    missing.join(", ")
                ))]);
            }
        }

        Ok(vec![])
    }
}

pub fn paging_object(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: PagingObjectOptions = parse_options(options)?;
    boxed(PagingObject {
        property: options.property,
        fields: options.fields,
    })
}

fn default_sections() -> Vec<String> {
    [
        "schemas",
        "responses",
        "parameters",
        "examples",
        "requestBodies",
        "headers",
        "links",
        "callbacks",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UnusedComponentsOptions {
    #[serde(default = "default_sections")]
    sections: Vec<String>,
}

/// Components never referenced through `$ref` anywhere in the document
#[derive(Debug)]
pub struct UnusedComponents {
    sections: Vec<String>,
}

fn collect_refs<'a>(node: &'a Node, out: &mut HashSet<&'a str>) {
    match node {
        Node::Mapping(entries) => {
            for (key, value) in entries {
                if key == "$ref" {
                    if let Some(target) = value.as_str() {
                        // Keep only the fragment so external prefixes still match
                        let fragment = target.split_once('#').map(|(_, f)| f).unwrap_or(target);
                        out.insert(fragment);
                    }
                } else {
                    collect_refs(value, out);
                }
            }
        }
        Node::Sequence(items) => items.iter().for_each(|item| collect_refs(item, out)),
        _ => {}
    }
}

impl Predicate for UnusedComponents {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let Some(components) = input.value.and_then(Node::as_mapping) else {
            return Ok(vec![]);
        };

        let mut refs = HashSet::new();
        collect_refs(input.document.root(), &mut refs);

        let mut violations = Vec::new();
        for (section, entries) in components {
            if !self.sections.contains(section) {
                continue;
            }
            let Some(entries) = entries.as_mapping() else {
                continue;
            };
            for (name, _) in entries {
                let pointer = format!("/components/{}/{}", section, name);
                if !refs.contains(pointer.as_str()) {
                    let at: NodePath = vec![
                        PathSegment::Key(section.clone()),
                        PathSegment::Key(name.clone()),
                    ]
                    .into_iter()
                    .collect();
                    violations.push(
                        Violation::new(format!("component '{}' is never referenced", pointer))
                            .at(at),
                    );
                }
            }
        }
        Ok(violations)
    }
}

pub fn unused_components(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: UnusedComponentsOptions = parse_options(options)?;
    boxed(UnusedComponents {
        sections: options.sections,
    })
}
