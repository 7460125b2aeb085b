//! apistyle - API style-guide rule engine
//!
//! Lints OpenAPI documents against catalogs of declarative rules. A rule pairs
//! JSONPath-like selectors with predicate checks; every match that fails a check
//! becomes a [`Diagnostic`].
//!
//! # Architecture
//!
//! ```text
//! CLI/API -> Config -> CatalogLoader -> Catalog -> Engine -> Document
//! ```
//!
//! Catalogs are YAML files. They may extend other catalogs (built-in or on disk) and
//! override inherited rules by code:
//!
//! ```yaml
//! name: my-team
//! extends: [sps]
//! overrides:
//!   sps-hosts-spscommerce-domain: 'off'
//!   sps-limit-path-size: error
//!
//! rules:
//!   - id: operation-summary
//!     message: '{error}'
//!     severity: warn
//!     given: '$.paths[*][*]'
//!     then:
//!       field: summary
//!       function: truthy
//! ```
//!
//! # Example
//!
//! ```no_run
//! use apistyle::{CatalogLoader, Document, Engine};
//! use std::sync::Arc;
//!
//! let catalog = CatalogLoader::new().load("sps").unwrap();
//! let engine = Engine::new(Arc::new(catalog));
//! let document = Document::from_yaml("openapi: 3.0.0\npaths: {}\n").unwrap();
//! for diagnostic in engine.evaluate(&document).all() {
//!     println!("{}: {}", diagnostic.code, diagnostic.message);
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod diagnostic;
pub mod document;
pub mod engine;
pub mod output;
pub mod predicates;
pub mod report;
pub mod rule;
pub mod selector;

// Re-export main types
pub use catalog::{builtin_names, Catalog, CatalogError, CatalogLoader};
pub use config::{Config, ConfigError, OutputFormat};
pub use diagnostic::{Diagnostic, Origin, Severity};
pub use document::{Document, DocumentError, Node, NodePath, PathSegment};
pub use engine::Engine;
pub use output::{CompactFormatter, JsonFormatter, OutputFormatter, TextFormatter};
pub use predicates::{CheckInput, Predicate, PredicateRegistry, Violation};
pub use report::{EvaluationResult, FileResult, LintResult, RuleTiming, SeverityCounts};
pub use rule::{Rule, RuleDefinition};
pub use selector::{Selector, SelectorError};
