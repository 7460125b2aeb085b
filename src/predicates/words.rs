//! Word-level checks on identifiers
//!
//! Identifiers are split into words at camelCase boundaries and at every
//! non-alphanumeric character, so `forSomething` is `for` + `something` while
//! `enforceForms` never yields `for`.

use super::{boxed, parse_options, CheckInput, Outcome, Predicate, Violation};
use serde::Deserialize;

/// Split an identifier into words
pub fn split_words(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            // `fooBar` or the `S` ending an acronym in `HTTPServer`
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Where a disallowed word may not appear
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordPosition {
    /// Anywhere in the identifier
    #[default]
    Any,
    First,
    Last,
    /// The identifier as a whole
    Whole,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct DisallowedWordsOptions {
    words: Vec<String>,
    #[serde(default)]
    position: WordPosition,
    #[serde(default)]
    case_sensitive: bool,
}

#[derive(Debug)]
pub struct DisallowedWords {
    words: Vec<String>,
    position: WordPosition,
    case_sensitive: bool,
}

impl DisallowedWords {
    fn same(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.to_lowercase() == b.to_lowercase()
        }
    }

    fn find(&self, candidate: &str) -> Option<&str> {
        self.words
            .iter()
            .find(|w| self.same(w, candidate))
            .map(String::as_str)
    }
}

impl Predicate for DisallowedWords {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let Some(text) = input.text() else {
            return Ok(vec![]);
        };

        let candidates: Vec<String> = match self.position {
            WordPosition::Whole => vec![text.to_string()],
            WordPosition::Any => split_words(text),
            WordPosition::First => split_words(text).into_iter().take(1).collect(),
            WordPosition::Last => split_words(text).into_iter().last().into_iter().collect(),
        };

        let mut found: Vec<&str> = Vec::new();
        for candidate in &candidates {
            if let Some(word) = self.find(candidate) {
                if !found.contains(&word) {
                    found.push(word);
                }
            }
        }

        Ok(found
            .into_iter()
            .map(|word| Violation::new(format!("'{}' contains the disallowed word '{}'", text, word)))
            .collect())
    }
}

pub fn disallowed_words(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: DisallowedWordsOptions = parse_options(options)?;
    if options.words.is_empty() {
        return Err("'words' must not be empty".to_string());
    }
    boxed(DisallowedWords {
        words: options.words,
        position: options.position,
        case_sensitive: options.case_sensitive,
    })
}

const DEFAULT_BOOLEAN_PREFIXES: &[&str] = &["is", "has", "was", "will", "needs", "uses", "should", "can"];

fn default_prefixes() -> Vec<String> {
    DEFAULT_BOOLEAN_PREFIXES.iter().map(|p| p.to_string()).collect()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BooleanPrefixOptions {
    #[serde(default = "default_prefixes")]
    prefixes: Vec<String>,
}

/// Boolean property whose first word is a verb prefix such as `is` or `has`
///
/// Only applies when the selected schema has `type: boolean`.
#[derive(Debug)]
pub struct BooleanPrefix {
    prefixes: Vec<String>,
}

impl Predicate for BooleanPrefix {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let Some(text) = input.text() else {
            return Ok(vec![]);
        };
        if input.given.get("type").and_then(|t| t.as_str()) != Some("boolean") {
            return Ok(vec![]);
        }

        let Some(first) = split_words(text).into_iter().next() else {
            return Ok(vec![]);
        };
        let first = first.to_lowercase();

        Ok(match self.prefixes.iter().find(|p| p.to_lowercase() == first) {
            Some(prefix) => vec![Violation::new(format!(
                "boolean property '{}' must not start with '{}'",
                text, prefix
            ))],
            None => vec![],
        })
    }
}

pub fn boolean_prefix(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: BooleanPrefixOptions = parse_options(options)?;
    boxed(BooleanPrefix {
        prefixes: options.prefixes,
    })
}
