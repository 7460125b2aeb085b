//! apistyle CLI - API style-guide linter
//!
//! Lints OpenAPI documents against a rule catalog.

use anyhow::{bail, Context, Result};
use apistyle::catalog::{builtin_names, Catalog, CatalogLoader};
use apistyle::config::{ColorMode, Config, OutputFormat};
use apistyle::engine::Engine;
use apistyle::output::formatter_for;
use apistyle::{Rule, Severity};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "apistyle",
    version,
    about = "API style-guide linter",
    long_about = "Lints OpenAPI documents against declarative rule catalogs. Ships the SPS Commerce style guide as the default catalog."
)]
struct Cli {
    /// Files, directories or glob patterns to lint
    files: Vec<String>,

    /// Catalog to lint with: a built-in name or a catalog file
    #[arg(short, long)]
    ruleset: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Disable specific rules (comma-separated)
    #[arg(long, value_delimiter = ',')]
    disable: Option<Vec<String>>,

    /// Only enable specific rules (comma-separated)
    #[arg(long, value_delimiter = ',')]
    select: Option<Vec<String>>,

    /// Select rules by prefix (e.g., 'sps-paths' selects all path rules)
    #[arg(long, value_delimiter = ',')]
    extend: Option<Vec<String>>,

    /// Ignore rules by prefix (e.g., 'sps-hosts' ignores all host rules)
    #[arg(long, value_delimiter = ',')]
    ignore: Option<Vec<String>>,

    /// Minimum severity to report
    #[arg(long, value_enum)]
    min_severity: Option<SeverityArg>,

    /// Lowest severity that makes the run fail
    #[arg(long, value_enum)]
    fail_on: Option<SeverityArg>,

    /// Show statistics
    #[arg(long)]
    stats: bool,

    /// Show per-rule timing statistics
    #[arg(long)]
    timing: bool,

    /// List the rules of the selected catalog and exit
    #[arg(long)]
    list_rules: bool,

    /// List built-in catalogs and exit
    #[arg(long)]
    list_rulesets: bool,

    /// Show detailed information about a specific rule
    #[arg(long)]
    explain: Option<String>,

    /// Exit with 0 even if problems are found
    #[arg(long)]
    exit_zero: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show detailed information about a rule
    Explain {
        /// Rule code to explain
        code: String,
    },
    /// Write a configuration file from a preset
    Init {
        /// Preset to use (recommended, strict, minimal)
        #[arg(long, default_value = "recommended")]
        preset: String,

        /// File format (yaml, json)
        #[arg(long, default_value = "yaml")]
        output_format: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    Compact,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::Compact => OutputFormat::Compact,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SeverityArg {
    Hint,
    Info,
    Warning,
    Error,
}

impl From<SeverityArg> for Severity {
    fn from(severity: SeverityArg) -> Self {
        match severity {
            SeverityArg::Hint => Severity::Hint,
            SeverityArg::Info => Severity::Information,
            SeverityArg::Warning => Severity::Warning,
            SeverityArg::Error => Severity::Error,
        }
    }
}

fn severity_label(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Error => "error".red(),
        Severity::Warning => "warning".yellow(),
        Severity::Information => "information".blue(),
        Severity::Hint => "hint".dimmed(),
    }
}

/// Print a rule in a consistent format
fn print_rule(rule: &Rule, enabled: bool) {
    let marker = if enabled { "".normal() } else { " [off]".dimmed() };
    println!("    {} [{}]{}", rule.code().cyan(), severity_label(rule.severity()), marker);
    if let Some(desc) = rule.description() {
        println!("      {}", desc);
    }
    if !rule.tags().is_empty() {
        println!("      Tags: {}", rule.tags().join(", "));
    }
}

/// Print detailed rule explanation
fn explain_rule(rule: &Rule) {
    println!("{}", "Rule Details".bold());
    println!();
    println!("  {}: {}", "Code".bold(), rule.code().cyan());
    println!("  {}: {}", "Severity".bold(), severity_label(rule.severity()));
    if !rule.is_enabled() {
        println!("  {}: {}", "Enabled".bold(), "no".dimmed());
    }

    if let Some(desc) = rule.description() {
        println!();
        println!("  {}", "Description".bold());
        println!("  {}", desc);
    }

    println!();
    println!("  {}", "Given".bold());
    for selector in rule.selectors() {
        println!("    {}", selector.as_str());
    }

    println!();
    println!("  {}", "Then".bold());
    for check in rule.checks() {
        match &check.field {
            Some(field) => println!("    {} on {}", check.function.cyan(), field),
            None => println!("    {}", check.function.cyan()),
        }
    }

    if let Some(message) = &rule.definition().message {
        println!();
        println!("  {}: {}", "Message".bold(), message);
    }

    if let Some(docs) = rule.docs() {
        println!();
        println!("  {}: {}", "Documentation".bold(), docs.blue());
    }

    if !rule.tags().is_empty() {
        println!();
        println!("  {}: {}", "Tags".bold(), rule.tags().join(", "));
    }
}

fn handle_explain(catalog: &Catalog, code: &str) -> Result<i32> {
    match catalog.get(code) {
        Some(rule) => {
            explain_rule(rule);
            Ok(0)
        }
        None => {
            eprintln!("{}: Rule '{}' not found in catalog '{}'", "error".red().bold(), code, catalog.name());
            eprintln!();
            eprintln!("Use {} to see all available rules", "--list-rules".cyan());
            Ok(2)
        }
    }
}

fn handle_list_rules(catalog: &Catalog, config: &Config) {
    println!("{} ({} rules)", catalog.name().bold(), catalog.len());
    if let Some(description) = catalog.description() {
        println!("  {}", description);
    }
    println!();
    for rule in catalog.rules() {
        print_rule(rule, rule.is_enabled() && config.is_rule_enabled(rule.code()));
    }
}

fn handle_init(preset: &str, output_format: &str) -> Result<i32> {
    let Some(config) = Config::preset(preset) else {
        bail!("Unknown preset '{}'. Available: recommended, strict, minimal", preset);
    };

    let filename = if output_format == "json" {
        ".apistylerc.json"
    } else {
        ".apistylerc.yaml"
    };
    if Path::new(filename).exists() {
        bail!("{} already exists. Remove it first to reinitialize.", filename);
    }

    let content = if output_format == "json" {
        serde_json::to_string_pretty(&config).context("failed to serialize configuration")?
    } else {
        let yaml = serde_yaml::to_string(&config).context("failed to serialize configuration")?;
        format!("# apistyle configuration\n# Generated with: apistyle init --preset {}\n\n{}", preset, yaml)
    };
    std::fs::write(filename, content).with_context(|| format!("failed to write {}", filename))?;

    println!("{} Created {}", "success".green().bold(), filename);
    println!();
    println!("Next steps:");
    println!("  1. Review and customize the configuration");
    println!("  2. Run {} to lint your API descriptions", "apistyle openapi.yaml".cyan());
    Ok(0)
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::load_default().context("failed to load config")?,
    };

    config.merge_cli(
        cli.format.map(OutputFormat::from),
        cli.verbose.then_some(true),
        cli.jobs,
        cli.disable.clone(),
        cli.select.clone(),
    );
    if let Some(prefixes) = &cli.extend {
        config.add_extend_prefixes(prefixes.clone());
    }
    if let Some(prefixes) = &cli.ignore {
        config.add_ignore_prefixes(prefixes.clone());
    }
    if let Some(ruleset) = &cli.ruleset {
        config.ruleset = Some(ruleset.clone());
    }
    if let Some(min) = cli.min_severity {
        config.output.min_severity = Some(min.into());
    }
    if let Some(fail_on) = cli.fail_on {
        config.fail_on = fail_on.into();
    }
    if cli.stats {
        config.output.statistics = true;
    }
    if cli.no_color {
        config.output.color = ColorMode::Never;
    }

    Ok(config)
}

fn run(cli: Cli) -> Result<i32> {
    if let Some(Commands::Init { preset, output_format }) = &cli.command {
        return handle_init(preset, output_format);
    }

    if cli.list_rulesets {
        for name in builtin_names() {
            println!("{}", name);
        }
        return Ok(0);
    }

    let config = load_config(&cli)?;
    match config.output.color {
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Auto => {}
    }

    let catalog = CatalogLoader::new()
        .load(config.ruleset())
        .with_context(|| format!("failed to load catalog '{}'", config.ruleset()))?;
    log::debug!("Loaded catalog '{}' with {} rules", catalog.name(), catalog.len());

    let explain = match &cli.command {
        Some(Commands::Explain { code }) => Some(code.as_str()),
        _ => cli.explain.as_deref(),
    };
    if let Some(code) = explain {
        return handle_explain(&catalog, code);
    }

    if cli.list_rules {
        handle_list_rules(&catalog, &config);
        return Ok(0);
    }

    if cli.files.is_empty() {
        eprintln!("{}: No files specified", "error".red().bold());
        eprintln!();
        eprintln!("Usage: apistyle [OPTIONS] <FILES>...");
        eprintln!("Try 'apistyle --help' for more information.");
        return Ok(2);
    }

    let files = config.files.expand(&cli.files).context("failed to resolve input files")?;
    if files.is_empty() {
        eprintln!("{}: No files found matching the specified patterns", "error".red().bold());
        return Ok(2);
    }
    if config.output.verbose {
        eprintln!("Linting {} file(s) with catalog '{}'", files.len(), catalog.name());
    }

    let fail_on = config.fail_on;
    let formatter = formatter_for(
        config.output.format,
        config.output.color != ColorMode::Never,
        config.output.statistics,
    );
    let engine = Engine::new(Arc::new(catalog)).with_config(config);
    let result = engine.lint_files(&files);

    print!("{}", formatter.format(&result));

    if cli.timing {
        eprintln!();
        eprint!("{}", result.format_timings());
    }

    if cli.exit_zero {
        Ok(0)
    } else {
        Ok(result.exit_code(fail_on))
    }
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            2
        }
    };
    std::process::exit(code);
}
