//! Diagnostic types for evaluation results

use crate::document::NodePath;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Severity level for diagnostics, ordered from least to most severe
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Suggestion only
    Hint,
    /// Informational message
    #[serde(alias = "info")]
    Information,
    /// Style violation that should be fixed
    #[default]
    #[serde(alias = "warn")]
    Warning,
    /// Definite violation of the style guide
    #[serde(alias = "err")]
    Error,
}

impl Severity {
    /// All severities, most severe first
    pub const ALL: [Severity; 4] = [
        Severity::Error,
        Severity::Warning,
        Severity::Information,
        Severity::Hint,
    ];
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Hint => write!(f, "hint"),
            Severity::Information => write!(f, "information"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    /// Accepts names and the numeric levels 0 (error) through 3 (hint)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hint" | "3" => Ok(Severity::Hint),
            "information" | "info" | "note" | "2" => Ok(Severity::Information),
            "warning" | "warn" | "1" => Ok(Severity::Warning),
            "error" | "err" | "0" => Ok(Severity::Error),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// What produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// A predicate reported a violation
    #[default]
    Rule,
    /// A predicate failed or panicked while evaluating
    Engine,
}

/// One finding for one rule at one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Code of the rule that produced this diagnostic
    pub code: String,
    pub severity: Severity,
    /// Human-readable message with placeholders already rendered
    pub message: String,
    /// Location of the offending node
    pub path: NodePath,
    #[serde(default)]
    pub origin: Origin,
    /// Document the diagnostic belongs to, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Help text (usually the rule description)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    /// Additional notes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(code: &str, severity: Severity, message: &str, path: NodePath) -> Self {
        Self {
            code: code.to_string(),
            severity,
            message: message.to_string(),
            path,
            origin: Origin::Rule,
            file: None,
            help: None,
            notes: Vec::new(),
        }
    }

    /// Diagnostic for a predicate that failed to evaluate
    pub fn engine(code: &str, message: &str, path: NodePath) -> Self {
        Self {
            origin: Origin::Engine,
            ..Self::new(code, Severity::Error, message, path)
        }
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.notes.push(note.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    pub fn is_engine_failure(&self) -> bool {
        self.origin == Origin::Engine
    }

    /// Identity used for de-duplication
    pub(crate) fn identity(&self) -> (&str, &NodePath, &str) {
        (&self.code, &self.path, &self.message)
    }
}
