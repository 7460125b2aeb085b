//! Integration tests for the sps:specification and sps:general catalogs

mod common;

use apistyle::Severity;
use common::Harness;
use pretty_assertions::assert_eq;

fn components(section: &str, name: &str) -> String {
    format!(
        "openapi: 3.1.0\npaths: {{}}\ncomponents:\n  {}:\n    {}:\n      description: Description\n",
        section, name
    )
}

fn info_version(version: &str) -> String {
    format!("openapi: 3.1.0\ninfo:\n  title: ''\n  version: '{}'\npaths: {{}}\n", version)
}

#[test]
fn test_component_names_pascal_case() {
    let harness = Harness::new("sps:specification");

    for (section, code) in [
        ("schemas", "schema-names-pascal-case"),
        ("responses", "sps-response-names-pascal-case"),
    ] {
        harness.validate_success(&components(section, "FooBar"), code);
        for name in ["fooBar", "foo_bar", "foo-bar"] {
            harness.validate_failure(&components(section, name), code, Severity::Warning, 1);
        }
    }
}

#[test]
fn test_general_response_names() {
    let harness = Harness::new("sps:general");
    let code = "response-names-pascal-case";

    harness.validate_success(&components("responses", "FooBar"), code);
    for name in ["fooBar", "foo_bar", "foo-bar"] {
        harness.validate_failure(&components("responses", name), code, Severity::Warning, 1);
    }
}

#[test]
fn test_semver() {
    for ruleset in ["sps:specification", "sps:general"] {
        let harness = Harness::new(ruleset);
        harness.validate_success(&info_version("1.2.3"), "semver");
        harness.validate_success(&info_version("2.0.0-beta.1+build.5"), "semver");
        for version in ["abc", "", "1.2", "01.2.3"] {
            harness.validate_failure(&info_version(version), "semver", Severity::Warning, 1);
        }
    }
}

#[test]
fn test_semver_message() {
    let result = Harness::new("sps:general").validate(&info_version("abc"));
    let semver: Vec<_> = result.by_code("semver").collect();

    assert_eq!(semver.len(), 1);
    assert_eq!(
        semver[0].message,
        "Version should use semantic versioning. abc is not a valid version."
    );
    assert_eq!(result.by_severity(Severity::Warning).count(), 1);
    assert_eq!(result.by_severity(Severity::Error).count(), 0);
}
