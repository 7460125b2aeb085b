//! Integration tests for the sps:webhooks and sps:errors catalogs

mod common;

use apistyle::Severity;
use common::Harness;

fn operation(path: &str, method: &str, extra: &str) -> String {
    format!(
        "openapi: 3.1.0\npaths:\n  {}:\n    {}:\n      summary: hello-world\n{}",
        path, method, extra
    )
}

fn error_response(status: &str, media_type: &str) -> String {
    format!(
        r#"
        openapi: 3.1.0
        paths:
          /v1/path:
            get:
              operationId: get-path
              responses:
                '{}':
                  description: error
                  content:
                    {}:
                      schema:
                        type: object
                        properties:
                          title:
                            type: string
        "#,
        status, media_type
    )
}

#[test]
fn test_webhooks_path() {
    let harness = Harness::new("sps:webhooks");
    let code = "sps-webhooks-path";

    harness.validate_success(&operation("/v1/producer/events", "get", ""), code);
    harness.validate_success(&operation("/v1/_webhooks/events", "get", ""), code);
    for path in [
        "/v1/webhooks/producer/events",
        "/v1/webhook/producer/events",
        "/v1/_webhook/producer/events",
        "/v1/producer-webhook/events",
    ] {
        harness.validate_failure(&operation(path, "get", ""), code, Severity::Error, 1);
    }
}

#[test]
fn test_webhooks_internal() {
    let harness = Harness::new("sps:webhooks");
    let code = "sps-webhooks-internal";
    let webhook = "/v1/_webhooks/producer/events";

    harness.validate_success(&operation("/v1/producer/events", "get", ""), code);
    harness.validate_success(&operation(webhook, "post", "      x-internal: true\n"), code);
    harness.validate_failure(&operation(webhook, "post", ""), code, Severity::Error, 1);
    harness.validate_failure(
        &operation(webhook, "post", "      x-internal: false\n"),
        code,
        Severity::Error,
        1,
    );
}

#[test]
fn test_webhooks_post() {
    let harness = Harness::new("sps:webhooks");
    let code = "sps-webhooks-post";
    let webhook = "/v1/_webhooks/producer/events";

    harness.validate_success(&operation("/v1/producer/events", "get", ""), code);
    harness.validate_success(&operation(webhook, "post", ""), code);
    for method in ["get", "put", "patch", "delete"] {
        harness.validate_failure(&operation(webhook, method, ""), code, Severity::Warning, 1);
    }
}

#[test]
fn test_unknown_error_format() {
    let harness = Harness::new("sps:errors");
    let code = "unknown-error-format";

    harness.validate_success(&error_response("400", "application/problem+json"), code);
    harness.validate_success(&error_response("500", "application/problem+json"), code);
    harness.validate_success(&error_response("400", "application/problem+xml"), code);
    harness.validate_success(&error_response("200", "application/json"), code);
    harness.validate_failure(&error_response("400", "application/json"), code, Severity::Error, 1);
    harness.validate_failure(&error_response("5XX", "application/json"), code, Severity::Error, 1);
}
