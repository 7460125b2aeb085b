//! Identifier casing

use super::{boxed, parse_options, CheckInput, Outcome, Predicate, Violation};
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::sync::OnceLock;

/// Supported casing styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStyle {
    /// `fooBar`
    Camel,
    /// `FooBar`
    Pascal,
    /// `foo-bar`
    Kebab,
    /// `foo_bar`
    Snake,
    /// `FOO_BAR`
    Macro,
    /// `foobar`
    Flat,
}

impl fmt::Display for CaseStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaseStyle::Camel => "camelCase",
            CaseStyle::Pascal => "PascalCase",
            CaseStyle::Kebab => "kebab-case",
            CaseStyle::Snake => "snake_case",
            CaseStyle::Macro => "MACRO_CASE",
            CaseStyle::Flat => "flatcase",
        };
        write!(f, "{}", name)
    }
}

struct Patterns {
    camel: Regex,
    pascal: Regex,
    kebab: Regex,
    snake: Regex,
    macro_case: Regex,
    flat: Regex,
    upper_run: Regex,
    trailing_acronym: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        camel: Regex::new(r"^[a-z][a-zA-Z0-9]*$").expect("valid regex"),
        pascal: Regex::new(r"^[A-Z][a-zA-Z0-9]*$").expect("valid regex"),
        kebab: Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid regex"),
        snake: Regex::new(r"^[a-z0-9]+(?:_[a-z0-9]+)*$").expect("valid regex"),
        macro_case: Regex::new(r"^[A-Z0-9]+(?:_[A-Z0-9]+)*$").expect("valid regex"),
        flat: Regex::new(r"^[a-z0-9]+$").expect("valid regex"),
        upper_run: Regex::new(r"[A-Z]{3,}").expect("valid regex"),
        trailing_acronym: Regex::new(r"[A-Z]{2}$").expect("valid regex"),
    })
}

impl CaseStyle {
    /// Whether `text` is written in this style
    ///
    /// camelCase additionally rejects runs of three or more capitals and a
    /// trailing two-letter acronym: `userIDcode` passes, `userID` and
    /// `invalidTESt` do not.
    pub fn matches(self, text: &str) -> bool {
        let p = patterns();
        match self {
            CaseStyle::Camel => {
                p.camel.is_match(text)
                    && !p.upper_run.is_match(text)
                    && !p.trailing_acronym.is_match(text)
            }
            CaseStyle::Pascal => p.pascal.is_match(text) && !p.upper_run.is_match(text),
            CaseStyle::Kebab => p.kebab.is_match(text),
            CaseStyle::Snake => p.snake.is_match(text),
            CaseStyle::Macro => p.macro_case.is_match(text),
            CaseStyle::Flat => p.flat.is_match(text),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct CasingOptions {
    #[serde(rename = "type")]
    style: CaseStyle,
    #[serde(default)]
    disallow_digits: bool,
}

#[derive(Debug)]
pub struct Casing {
    style: CaseStyle,
    disallow_digits: bool,
}

impl Predicate for Casing {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let Some(text) = input.text() else {
            return Ok(vec![]);
        };

        if !self.style.matches(text) {
            return Ok(vec![Violation::new(format!(
                "'{}' is not {}",
                text, self.style
            ))]);
        }
        if self.disallow_digits && text.chars().any(|c| c.is_ascii_digit()) {
            return Ok(vec![Violation::new(format!(
                "'{}' must not contain digits",
                text
            ))]);
        }
        Ok(vec![])
    }
}

pub fn casing(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: CasingOptions = parse_options(options)?;
    boxed(Casing {
        style: options.style,
        disallow_digits: options.disallow_digits,
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::{options, run_text};
    use super::*;

    #[test]
    fn test_camel_case() {
        for ok in ["fooBar", "test1", "userIDcode", "censusScheduleKLocation", "id"] {
            assert!(CaseStyle::Camel.matches(ok), "{} should pass", ok);
        }
        for bad in [
            "FooBar",
            "foo_bar",
            "foo-bar",
            "invalidTESt",
            "invalidTESTtest",
            "userID",
            "orderID",
            "OrderNumber",
            "line_item_number",
            "User_Id",
            "user_Name",
            "",
        ] {
            assert!(!CaseStyle::Camel.matches(bad), "{} should fail", bad);
        }
    }

    #[test]
    fn test_other_styles() {
        assert!(CaseStyle::Pascal.matches("FooBar"));
        assert!(!CaseStyle::Pascal.matches("fooBar"));
        assert!(!CaseStyle::Pascal.matches("Foo_Bar"));
        assert!(!CaseStyle::Pascal.matches("foo-bar"));
        assert!(CaseStyle::Kebab.matches("line-items"));
        assert!(!CaseStyle::Kebab.matches("lineItems"));
        assert!(!CaseStyle::Kebab.matches("line--items"));
        assert!(CaseStyle::Snake.matches("line_items"));
        assert!(CaseStyle::Macro.matches("LINE_ITEMS"));
        assert!(CaseStyle::Flat.matches("lineitems"));
    }

    #[test]
    fn test_predicate() {
        let p = casing(&options("type: camel")).unwrap();
        assert!(run_text(p.as_ref(), "orderNumber").is_empty());
        let violations = run_text(p.as_ref(), "OrderNumber");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "'OrderNumber' is not camelCase");
    }

    #[test]
    fn test_disallow_digits() {
        let p = casing(&options("type: kebab\ndisallowDigits: true")).unwrap();
        assert!(run_text(p.as_ref(), "orders").is_empty());
        assert_eq!(run_text(p.as_ref(), "orders2").len(), 1);
    }

    #[test]
    fn test_missing_type_is_invalid() {
        assert!(casing(&serde_yaml::Value::Null).is_err());
    }
}
