//! Configuration for the linter
//!
//! Reads configuration from:
//! - `.apistylerc.yaml` / `.apistylerc.yml` / `.apistylerc.json` (project-level)
//! - the same names in the home directory (user-level)
//!
//! Configuration selects the catalog and adjusts rules without editing catalog
//! files: rules can be disabled, selected by prefix, re-severitied, or ignored for
//! files matching a glob.

use crate::diagnostic::Severity;
use globset::{Glob, GlobMatcher, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default catalog when neither config nor CLI names one
pub const DEFAULT_RULESET: &str = "sps";

const CONFIG_NAMES: [&str; 4] = [
    ".apistylerc.yaml",
    ".apistylerc.yml",
    ".apistylerc.json",
    "apistyle.yaml",
];

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lint files in parallel
    pub parallel: bool,

    /// Number of parallel jobs (0 = auto-detect)
    pub jobs: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            jobs: 0,
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,

    pub color: ColorMode,

    pub verbose: bool,

    /// Print a summary after the diagnostics
    pub statistics: bool,

    /// Hide diagnostics below this severity
    pub min_severity: Option<Severity>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: ColorMode::Auto,
            verbose: false,
            statistics: true,
            min_severity: None,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Compact,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "compact" => Ok(OutputFormat::Compact),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Color mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// File discovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Patterns used when a directory is given
    pub include: Vec<String>,

    pub exclude: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            include: vec![
                "**/*.yaml".to_string(),
                "**/*.yml".to_string(),
                "**/*.json".to_string(),
            ],
            exclude: vec![
                "**/node_modules/**".to_string(),
                "**/target/**".to_string(),
                "**/.git/**".to_string(),
            ],
        }
    }
}

impl FilesConfig {
    /// Resolve CLI inputs to document paths.
    ///
    /// Files are taken as given, directories are searched with the `include`
    /// patterns, and anything else is treated as a glob. Paths matching `exclude`
    /// are dropped and duplicates keep their first position.
    pub fn expand(&self, inputs: &[String]) -> Result<Vec<PathBuf>, ConfigError> {
        let exclude = build_globset(&self.exclude)?;
        let mut files: Vec<PathBuf> = Vec::new();
        let push = |path: PathBuf, files: &mut Vec<PathBuf>| {
            if !exclude.is_match(&path) && !files.contains(&path) {
                files.push(path);
            }
        };

        for input in inputs {
            let path = Path::new(input);
            if path.is_file() {
                push(path.to_path_buf(), &mut files);
            } else if path.is_dir() {
                for pattern in &self.include {
                    let joined = path.join(pattern);
                    for entry in glob_files(&joined.to_string_lossy())? {
                        push(entry, &mut files);
                    }
                }
            } else {
                let matched = glob_files(input)?;
                if matched.is_empty() {
                    log::warn!("No files match '{}'", input);
                }
                for entry in matched {
                    push(entry, &mut files);
                }
            }
        }

        Ok(files)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| ConfigError::Invalid(format!("invalid glob '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ConfigError::Invalid(format!("invalid glob set: {}", e)))
}

fn glob_files(pattern: &str) -> Result<Vec<PathBuf>, ConfigError> {
    let entries = glob::glob(pattern)
        .map_err(|e| ConfigError::Invalid(format!("invalid pattern '{}': {}", pattern, e)))?;
    let mut files: Vec<PathBuf> = entries.flatten().filter(|entry| entry.is_file()).collect();
    files.sort();
    Ok(files)
}

/// Rule configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Disabled rule codes
    pub disabled: Vec<String>,

    /// Enabled rule codes (empty = all)
    pub enabled: Vec<String>,

    /// Select rules by code prefix (e.g., "sps-paths" selects all path rules)
    #[serde(alias = "select")]
    pub extend: Vec<String>,

    /// Ignore rules by code prefix
    pub ignore: Vec<String>,

    /// Severity overrides (code -> severity)
    pub severity: HashMap<String, Severity>,

    /// Per-file rule ignores (glob pattern -> codes, or "all")
    pub per_file: HashMap<String, Vec<String>>,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Presets or other configuration files to inherit from
    pub extends: Vec<String>,

    /// Catalog reference: a built-in name or a catalog file
    pub ruleset: Option<String>,

    pub engine: EngineConfig,

    pub output: OutputConfig,

    pub files: FilesConfig,

    pub rules: RulesConfig,

    /// Lowest severity that makes the run fail
    pub fail_on: Severity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extends: Vec::new(),
            ruleset: None,
            engine: EngineConfig::default(),
            output: OutputConfig::default(),
            files: FilesConfig::default(),
            rules: RulesConfig::default(),
            fail_on: Severity::Error,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a preset configuration by name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "recommended" => Some(Self::preset_recommended()),
            "strict" => Some(Self::preset_strict()),
            "minimal" => Some(Self::preset_minimal()),
            _ => None,
        }
    }

    /// Full style guide, failing on errors
    fn preset_recommended() -> Self {
        Self {
            ruleset: Some(DEFAULT_RULESET.to_string()),
            ..Self::default()
        }
    }

    /// Full style guide, failing on warnings too
    fn preset_strict() -> Self {
        Self {
            ruleset: Some(DEFAULT_RULESET.to_string()),
            fail_on: Severity::Warning,
            ..Self::default()
        }
    }

    /// Errors only
    fn preset_minimal() -> Self {
        let mut config = Self {
            ruleset: Some(DEFAULT_RULESET.to_string()),
            ..Self::default()
        };
        config.output.min_severity = Some(Severity::Error);
        config
    }

    /// Load a configuration file and everything it extends
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load_layer(path, 0)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse one file; `.json` is JSON, `.yaml`/`.yml` are YAML
    fn parse_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Ok(serde_yaml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            other => Err(ConfigError::Invalid(format!(
                "{} has an unsupported extension '{}'",
                path.display(),
                other.unwrap_or("")
            ))),
        }
    }

    fn load_layer(path: &Path, depth: usize) -> Result<Self, ConfigError> {
        const MAX_EXTENDS_DEPTH: usize = 10;
        if depth >= MAX_EXTENDS_DEPTH {
            return Err(ConfigError::Invalid(format!(
                "{} extends more than {} levels deep",
                path.display(),
                MAX_EXTENDS_DEPTH
            )));
        }

        let layer = Self::parse_file(path)?;
        log::debug!("Loaded configuration layer {}", path.display());
        if layer.extends.is_empty() {
            return Ok(layer);
        }

        // Parents apply in order, then this layer on top
        let base_dir = path.parent().unwrap_or(Path::new("."));
        let mut resolved = Self::default();
        for parent in &layer.extends {
            let parent_config = match Self::preset(parent) {
                Some(preset) => preset,
                None => Self::load_layer(&base_dir.join(parent), depth + 1)?,
            };
            resolved.merge(parent_config);
        }
        resolved.merge(layer);
        Ok(resolved)
    }

    /// Reject patterns that cannot be compiled
    pub fn validate(&self) -> Result<(), ConfigError> {
        let patterns = self
            .files
            .include
            .iter()
            .chain(&self.files.exclude)
            .chain(self.rules.per_file.keys());
        for pattern in patterns {
            Glob::new(pattern)
                .map_err(|e| ConfigError::Invalid(format!("invalid glob '{}': {}", pattern, e)))?;
        }
        Ok(())
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        if other.ruleset.is_some() {
            self.ruleset = other.ruleset;
        }

        if other.engine.jobs != 0 {
            self.engine.jobs = other.engine.jobs;
        }
        self.engine.parallel = other.engine.parallel;

        if other.output.format != OutputFormat::Text {
            self.output.format = other.output.format;
        }
        if other.output.verbose {
            self.output.verbose = true;
        }
        if other.output.color != ColorMode::Auto {
            self.output.color = other.output.color;
        }
        if !other.output.statistics {
            self.output.statistics = false;
        }
        if other.output.min_severity.is_some() {
            self.output.min_severity = other.output.min_severity;
        }

        for pattern in other.files.include {
            if !self.files.include.contains(&pattern) {
                self.files.include.push(pattern);
            }
        }
        for pattern in other.files.exclude {
            if !self.files.exclude.contains(&pattern) {
                self.files.exclude.push(pattern);
            }
        }

        self.rules.disabled.extend(other.rules.disabled);
        if !other.rules.enabled.is_empty() {
            self.rules.enabled = other.rules.enabled;
        }
        self.rules.extend.extend(other.rules.extend);
        self.rules.ignore.extend(other.rules.ignore);
        self.rules.severity.extend(other.rules.severity);
        for (pattern, rules) in other.rules.per_file {
            self.rules.per_file.entry(pattern).or_default().extend(rules);
        }

        if other.fail_on != Severity::Error {
            self.fail_on = other.fail_on;
        }
    }

    /// Find a configuration file in `dir`, then in the home directory
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        let home = dirs::home_dir();
        std::iter::once(dir.to_path_buf())
            .chain(home)
            .flat_map(|base| CONFIG_NAMES.iter().map(move |name| base.join(name)))
            .find(|path| path.is_file())
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::discover(Path::new(".")) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Catalog reference to load
    pub fn ruleset(&self) -> &str {
        self.ruleset.as_deref().unwrap_or(DEFAULT_RULESET)
    }

    /// Merge CLI arguments into configuration
    pub fn merge_cli(
        &mut self,
        format: Option<OutputFormat>,
        verbose: Option<bool>,
        jobs: Option<usize>,
        disabled_rules: Option<Vec<String>>,
        enabled_rules: Option<Vec<String>>,
    ) {
        if let Some(f) = format {
            self.output.format = f;
        }
        if let Some(v) = verbose {
            self.output.verbose = v;
        }
        if let Some(j) = jobs {
            self.engine.jobs = j;
        }
        if let Some(disabled) = disabled_rules {
            self.rules.disabled.extend(disabled);
        }
        if let Some(enabled) = enabled_rules {
            self.rules.enabled = enabled;
        }
    }

    /// Add prefixes to select rules by
    pub fn add_extend_prefixes(&mut self, prefixes: Vec<String>) {
        self.rules.extend.extend(prefixes);
    }

    pub fn add_ignore_prefixes(&mut self, prefixes: Vec<String>) {
        self.rules.ignore.extend(prefixes);
    }

    /// Check if a rule is enabled by configuration
    pub fn is_rule_enabled(&self, code: &str) -> bool {
        if self.rules.disabled.iter().any(|d| d == code) {
            return false;
        }

        if self.matches_ignore_prefix(code) {
            return false;
        }

        if !self.rules.enabled.is_empty() {
            return self.rules.enabled.iter().any(|e| e == code);
        }

        self.matches_extend_prefix(code)
    }

    /// Check if a rule matches any prefix in the extend list (case-insensitive)
    pub fn matches_extend_prefix(&self, code: &str) -> bool {
        if self.rules.extend.is_empty() {
            return true;
        }
        let code = code.to_lowercase();
        self.rules
            .extend
            .iter()
            .any(|prefix| code.starts_with(&prefix.to_lowercase()))
    }

    /// Check if a rule matches any prefix in the ignore list (case-insensitive)
    pub fn matches_ignore_prefix(&self, code: &str) -> bool {
        let code = code.to_lowercase();
        self.rules
            .ignore
            .iter()
            .any(|prefix| code.starts_with(&prefix.to_lowercase()))
    }

    pub fn get_severity_override(&self, code: &str) -> Option<Severity> {
        self.rules.severity.get(code).copied()
    }

    /// Compile per-file ignores for repeated lookups
    pub fn per_file_ignores(&self) -> PerFileIgnores {
        let entries = self
            .rules
            .per_file
            .iter()
            .filter_map(|(pattern, codes)| match Glob::new(pattern) {
                Ok(glob) => Some((glob.compile_matcher(), codes.clone())),
                Err(e) => {
                    log::warn!("Ignoring invalid per-file pattern '{}': {}", pattern, e);
                    None
                }
            })
            .collect();
        PerFileIgnores { entries }
    }

    /// Check if a rule should be ignored for a file
    pub fn should_ignore_rule_for_file(&self, code: &str, file_path: &Path) -> bool {
        self.per_file_ignores().is_ignored(code, file_path)
    }
}

/// Compiled `rules.per_file` patterns
#[derive(Debug, Clone, Default)]
pub struct PerFileIgnores {
    entries: Vec<(GlobMatcher, Vec<String>)>,
}

impl PerFileIgnores {
    pub fn is_ignored(&self, code: &str, file_path: &Path) -> bool {
        self.entries.iter().any(|(matcher, codes)| {
            matcher.is_match(file_path) && codes.iter().any(|c| c == "all" || c == code)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::new();
        assert!(config.engine.parallel);
        assert_eq!(config.engine.jobs, 0);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert_eq!(config.fail_on, Severity::Error);
        assert_eq!(config.ruleset(), "sps");
        assert!(!config.files.include.is_empty());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("compact".parse::<OutputFormat>().unwrap(), OutputFormat::Compact);
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_config_merge_cli() {
        let mut config = Config::new();
        config.merge_cli(
            Some(OutputFormat::Json),
            Some(true),
            Some(4),
            Some(vec!["sps-hosts-no-port".to_string()]),
            None,
        );

        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.verbose);
        assert_eq!(config.engine.jobs, 4);
        assert!(!config.is_rule_enabled("sps-hosts-no-port"));
    }

    #[test]
    fn test_rule_enabled() {
        let mut config = Config::new();
        assert!(config.is_rule_enabled("any-rule"));

        config.rules.disabled.push("disabled-rule".to_string());
        assert!(!config.is_rule_enabled("disabled-rule"));
        assert!(config.is_rule_enabled("other-rule"));

        config.rules.enabled = vec!["only-this".to_string()];
        assert!(!config.is_rule_enabled("other-rule"));
        assert!(config.is_rule_enabled("only-this"));
    }

    #[test]
    fn test_prefix_selection() {
        let mut config = Config::new();
        config.add_extend_prefixes(vec!["sps-paths".to_string()]);
        config.add_ignore_prefixes(vec!["SPS-PATHS-WITH".to_string()]);

        assert!(config.is_rule_enabled("sps-paths-kebab-case"));
        assert!(!config.is_rule_enabled("sps-paths-with-api"));
        assert!(!config.is_rule_enabled("sps-hosts-no-port"));
    }

    #[test]
    fn test_yaml_deserialize() {
        let yaml = r#"
ruleset: sps:naming
fail_on: warning
engine:
  parallel: false
  jobs: 4
output:
  format: json
  min_severity: warning
rules:
  disabled: [sps-limit-path-size]
  severity:
    sps-no-collection-paging-capability: warning
  per_file:
    "legacy/**": [all]
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.ruleset(), "sps:naming");
        assert_eq!(config.fail_on, Severity::Warning);
        assert!(!config.engine.parallel);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.min_severity, Some(Severity::Warning));
        assert_eq!(
            config.get_severity_override("sps-no-collection-paging-capability"),
            Some(Severity::Warning)
        );
        assert!(config.should_ignore_rule_for_file("anything", Path::new("legacy/v1/api.yaml")));
        assert!(!config.should_ignore_rule_for_file("anything", Path::new("current/api.yaml")));
    }

    #[test]
    fn test_extends_preset_and_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("base.yaml"),
            "rules:\n  disabled: [sps-limit-path-size]\n",
        )
        .unwrap();
        let path = dir.path().join(".apistylerc.yaml");
        std::fs::write(&path, "extends: [strict, base.yaml]\noutput:\n  format: compact\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.fail_on, Severity::Warning);
        assert_eq!(config.output.format, OutputFormat::Compact);
        assert!(!config.is_rule_enabled("sps-limit-path-size"));
    }

    #[test]
    fn test_invalid_glob_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "files:\n  include: ['a/[']\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_discover() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".apistylerc.yml"), "fail_on: hint\n").unwrap();
        let found = Config::discover(dir.path()).unwrap();
        assert!(found.ends_with(".apistylerc.yml"));
    }

    #[test]
    fn test_expand_directory_and_excludes() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("specs/node_modules")).unwrap();
        std::fs::write(dir.path().join("specs/orders.yaml"), "openapi: 3.0.0\n").unwrap();
        std::fs::write(dir.path().join("specs/items.json"), "{}").unwrap();
        std::fs::write(dir.path().join("specs/notes.txt"), "x").unwrap();
        std::fs::write(dir.path().join("specs/node_modules/dep.yaml"), "x: 1\n").unwrap();

        let input = dir.path().join("specs").to_string_lossy().to_string();
        let files = FilesConfig::default().expand(&[input]).unwrap();
        let names: Vec<_> = files
            .iter()
            .filter_map(|f| f.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["orders.yaml", "items.json"]);
    }

    #[test]
    fn test_expand_deduplicates_files() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("api.yaml");
        std::fs::write(&file, "openapi: 3.0.0\n").unwrap();
        let input = file.to_string_lossy().to_string();
        let pattern = dir.path().join("*.yaml").to_string_lossy().to_string();

        let files = FilesConfig::default().expand(&[input, pattern]).unwrap();
        assert_eq!(files, vec![file]);
    }
}
