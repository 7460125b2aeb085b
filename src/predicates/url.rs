//! Server URL and path template checks

use super::casing::CaseStyle;
use super::{boxed, parse_options, CheckInput, Outcome, Predicate, Violation};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// The parts of a server URL these predicates care about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerUrl<'a> {
    pub scheme: Option<&'a str>,
    /// Scheme and authority, as written
    pub origin: &'a str,
    pub host: &'a str,
    pub port: Option<&'a str>,
}

impl<'a> ServerUrl<'a> {
    pub fn parse(text: &'a str) -> Self {
        let (scheme, rest) = match text.split_once("://") {
            Some((scheme, rest)) => (Some(scheme), rest),
            None => (None, text),
        };

        let authority_end = rest.find(|c: char| matches!(c, '/' | '?' | '#')).unwrap_or(rest.len());
        let authority = &rest[..authority_end];
        let origin_len = text.len() - rest.len() + authority_end;
        let host_port = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);

        let (host, port) = if host_port.starts_with('[') {
            match host_port.find(']') {
                Some(end) => {
                    let port = host_port[end + 1..].strip_prefix(':');
                    (&host_port[..=end], port)
                }
                None => (host_port, None),
            }
        } else {
            match host_port.rsplit_once(':') {
                Some((host, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
                    (host, Some(port))
                }
                _ => (host_port, None),
            }
        };

        Self {
            scheme,
            origin: &text[..origin_len],
            host,
            port,
        }
    }

    /// Relative URLs such as `/v1` have no host
    pub fn is_relative(&self) -> bool {
        self.scheme.is_none() && (self.host.is_empty() || self.origin.starts_with('/'))
    }

    /// `localhost` and loopback literals
    pub fn is_local(&self) -> bool {
        let host = self.host.to_ascii_lowercase();
        host == "localhost"
            || host.ends_with(".localhost")
            || host.starts_with("127.")
            || host == "[::1]"
            || host == "0.0.0.0"
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct LocalOptions {
    #[serde(default)]
    allow_local: bool,
}

/// Server URLs must use `https`
#[derive(Debug)]
pub struct HttpsOnly {
    allow_local: bool,
}

impl Predicate for HttpsOnly {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let Some(text) = input.text() else {
            return Ok(vec![]);
        };
        let url = ServerUrl::parse(text);
        if url.is_relative() || (self.allow_local && url.is_local()) {
            return Ok(vec![]);
        }

        Ok(match url.scheme {
            Some(scheme) if scheme.eq_ignore_ascii_case("https") => vec![],
            _ => vec![Violation::new(format!("server URL '{}' must use https", text))],
        })
    }
}

pub fn https_only(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: LocalOptions = parse_options(options)?;
    boxed(HttpsOnly {
        allow_local: options.allow_local,
    })
}

/// Scheme and host must be lowercase
#[derive(Debug)]
pub struct HostLowercase;

impl Predicate for HostLowercase {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let Some(text) = input.text() else {
            return Ok(vec![]);
        };
        let url = ServerUrl::parse(text);
        Ok(if url.origin.chars().any(char::is_uppercase) {
            vec![Violation::new(format!("host of '{}' must be lowercase", text))]
        } else {
            vec![]
        })
    }
}

pub fn host_lowercase(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    super::no_options(options)?;
    boxed(HostLowercase)
}

/// Server URLs must not carry an explicit port
#[derive(Debug)]
pub struct NoPort {
    allow_local: bool,
}

impl Predicate for NoPort {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let Some(text) = input.text() else {
            return Ok(vec![]);
        };
        let url = ServerUrl::parse(text);
        if self.allow_local && url.is_local() {
            return Ok(vec![]);
        }
        Ok(match url.port {
            Some(port) => vec![Violation::new(format!(
                "server URL '{}' must not specify port {}",
                text, port
            ))],
            None => vec![],
        })
    }
}

pub fn no_port(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: LocalOptions = parse_options(options)?;
    boxed(NoPort {
        allow_local: options.allow_local,
    })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct HostDomainOptions {
    domains: Vec<String>,
    #[serde(default)]
    allow_local: bool,
}

/// Host must be one of the listed domains or a subdomain of one
#[derive(Debug)]
pub struct HostDomain {
    domains: Vec<String>,
    allow_local: bool,
}

impl Predicate for HostDomain {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let Some(text) = input.text() else {
            return Ok(vec![]);
        };
        let url = ServerUrl::parse(text);
        if url.is_relative() || (self.allow_local && url.is_local()) {
            return Ok(vec![]);
        }

        let host = url.host.to_ascii_lowercase();
        let allowed = self
            .domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{}", d)));

        Ok(if allowed {
            vec![]
        } else {
            vec![Violation::new(format!(
                "host '{}' is not under {}",
                url.host,
                self.domains.join(" or ")
            ))]
        })
    }
}

pub fn host_domain(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: HostDomainOptions = parse_options(options)?;
    if options.domains.is_empty() {
        return Err("'domains' must not be empty".to_string());
    }
    boxed(HostDomain {
        domains: options
            .domains
            .into_iter()
            .map(|d| d.to_ascii_lowercase())
            .collect(),
        allow_local: options.allow_local,
    })
}

fn is_template(segment: &str) -> bool {
    segment.contains('{')
}

fn placeholder_count(path: &str) -> usize {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{[^{}]*\}").expect("valid regex"))
        .find_iter(path)
        .count()
}

fn is_version(segment: &str) -> bool {
    static VERSION: OnceLock<Regex> = OnceLock::new();
    VERSION
        .get_or_init(|| Regex::new(r"^v\d+$").expect("valid regex"))
        .is_match(segment)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MaxOptions {
    max: usize,
}

/// Number of `{placeholders}` in a path template
#[derive(Debug)]
pub struct PathParameterCount {
    max: usize,
}

impl Predicate for PathParameterCount {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let Some(path) = input.text() else {
            return Ok(vec![]);
        };
        let count = placeholder_count(path);
        Ok(if count > self.max {
            vec![Violation::new(format!(
                "'{}' has {} path parameters, more than {}",
                path, count, self.max
            ))]
        } else {
            vec![]
        })
    }
}

pub fn path_parameter_count(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: MaxOptions = parse_options(options)?;
    boxed(PathParameterCount { max: options.max })
}

/// Static sub-resources after the version segment
///
/// Without a `v<N>` segment every static segment counts.
#[derive(Debug)]
pub struct PathHierarchy {
    max: usize,
}

impl PathHierarchy {
    fn depth(path: &str) -> usize {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let start = segments
            .iter()
            .position(|s| is_version(s))
            .map(|i| i + 1)
            .unwrap_or(0);
        segments[start..].iter().filter(|s| !is_template(s)).count()
    }
}

impl Predicate for PathHierarchy {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let Some(path) = input.text() else {
            return Ok(vec![]);
        };
        let depth = Self::depth(path);
        Ok(if depth > self.max {
            vec![Violation::new(format!(
                "'{}' nests {} sub-resources, more than {}",
                path, depth, self.max
            ))]
        } else {
            vec![]
        })
    }
}

pub fn path_hierarchy(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: MaxOptions = parse_options(options)?;
    boxed(PathHierarchy { max: options.max })
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct PathSegmentsOptions {
    casing: Option<CaseStyle>,
    #[serde(default)]
    forbidden: Vec<String>,
    #[serde(default)]
    no_empty_segments: bool,
    #[serde(default)]
    no_trailing_slash: bool,
    #[serde(default = "default_true")]
    allow_leading_underscore: bool,
}

/// Per-segment checks on a path template; template segments are skipped
#[derive(Debug)]
pub struct PathSegments {
    casing: Option<CaseStyle>,
    forbidden: Vec<String>,
    no_empty_segments: bool,
    no_trailing_slash: bool,
    allow_leading_underscore: bool,
}

impl Predicate for PathSegments {
    fn evaluate(&self, input: &CheckInput<'_>) -> Outcome {
        let Some(path) = input.text() else {
            return Ok(vec![]);
        };

        let mut violations = Vec::new();
        if self.no_trailing_slash && path.len() > 1 && path.ends_with('/') {
            violations.push(Violation::new(format!("'{}' must not end with a slash", path)));
        }

        let body = path.strip_prefix('/').unwrap_or(path);
        let body = body.strip_suffix('/').unwrap_or(body);
        if body.is_empty() {
            return Ok(violations);
        }

        for raw in body.split('/') {
            if raw.is_empty() {
                if self.no_empty_segments {
                    violations.push(Violation::new(format!("'{}' contains an empty segment", path)));
                }
                continue;
            }
            if is_template(raw) {
                continue;
            }

            let segment = if self.allow_leading_underscore {
                raw.strip_prefix('_').unwrap_or(raw)
            } else {
                raw
            };

            if let Some(style) = self.casing {
                if !style.matches(segment) {
                    violations.push(Violation::new(format!(
                        "segment '{}' of '{}' is not {}",
                        raw, path, style
                    )));
                }
            }
            if self.forbidden.iter().any(|f| f.eq_ignore_ascii_case(segment)) {
                violations.push(Violation::new(format!(
                    "segment '{}' of '{}' is not allowed",
                    raw, path
                )));
            }
        }

        Ok(violations)
    }
}

pub fn path_segments(options: &serde_yaml::Value) -> Result<Box<dyn Predicate>, String> {
    let options: PathSegmentsOptions = parse_options(options)?;
    if options.casing.is_none()
        && options.forbidden.is_empty()
        && !options.no_empty_segments
        && !options.no_trailing_slash
    {
        return Err("at least one segment check must be configured".to_string());
    }
    boxed(PathSegments {
        casing: options.casing,
        forbidden: options.forbidden,
        no_empty_segments: options.no_empty_segments,
        no_trailing_slash: options.no_trailing_slash,
        allow_leading_underscore: options.allow_leading_underscore,
    })
}
