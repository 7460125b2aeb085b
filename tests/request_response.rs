//! Integration tests for the sps:request-response catalog

mod common;

use apistyle::Severity;
use common::Harness;

fn harness() -> Harness {
    Harness::new("sps:request-response")
}

/// A `/example` operation answering with the given status codes
fn responses(method: &str, codes: &[&str]) -> String {
    let mut spec = format!(
        "openapi: 3.1.0\npaths:\n  /example:\n    {}:\n      summary: Example endpoint\n      responses:\n",
        method
    );
    for code in codes {
        spec.push_str(&format!("        '{}':\n          description: Response {}\n", code, code));
    }
    spec
}

/// A GET 200 response declaring the given headers
fn headers(names: &[&str]) -> String {
    let mut spec = String::from(
        "openapi: 3.1.0\npaths:\n  /users:\n    get:\n      responses:\n        '200':\n          description: A list of users\n          headers:\n",
    );
    for name in names {
        spec.push_str(&format!(
            "            {}:\n              schema:\n                type: string\n                default: custom value\n",
            name
        ));
    }
    spec
}

/// A GET 200 response with one media type
fn media_type(mime: &str) -> String {
    format!(
        "openapi: 3.1.0\npaths:\n  /items:\n    get:\n      responses:\n        '200':\n          description: ok\n          content:\n            {}:\n              schema:\n                $ref: '#/components/schemas/Item'\n",
        mime
    )
}

#[test]
fn test_authorization_missing() {
    let harness = harness();
    let code = "sps-authorization-missing";

    let spec = r#"
      openapi: 3.1.0
      info:
        title: Sample API
        version: 1.0.0
      paths:
        /users:
          get:
            responses:
              '200':
                description: A list of users
      security:
        - ApiKeyAuth: []
    "#;
    harness.validate_success(spec, code);

    let spec = r#"
      openapi: 3.1.0
      info:
        title: Sample API
        version: 1.0.0
      paths:
        /users:
          get:
            responses:
              '200':
                description: A list of users
    "#;
    harness.validate_failure(spec, code, Severity::Error, 1);
}

#[test]
fn test_default_content_language() {
    let harness = harness();
    let code = "sps-default-content-language";
    let spec = |default: &str| {
        format!(
            "paths:\n  /items:\n    get:\n      responses:\n        '200':\n          description: ok\n          headers:\n            Content-Language:\n              schema:\n                type: string\n                default: {}\n",
            default
        )
    };

    harness.validate_success(&spec("en-US"), code);
    harness.validate_success(&responses("get", &["200"]), code);
    harness.validate_failure(&spec("fr-FR"), code, Severity::Error, 1);
}

#[test]
fn test_custom_header_format() {
    let harness = harness();
    let code = "sps-invalid-custom-header-format";

    harness.validate_success(&headers(&["Sps-Custom-Header-12345"]), code);
    harness.validate_success(&headers(&["Content-Language", "ETag", "Location"]), code);
    harness.validate_failure(&headers(&["SPS-Custom-Header-12345"]), code, Severity::Error, 1);
    harness.validate_failure(&headers(&["X-Custom-Header-12345"]), code, Severity::Error, 1);
    harness.validate_failure(
        &headers(&["Sps-Custom-Header-123456789012345678901234567890123456789012345678901"]),
        code,
        Severity::Error,
        1,
    );
}

#[test]
fn test_no_explicit_headers() {
    let harness = harness();
    let code = "sps-no-explicit-headers";

    harness.validate_success(&headers(&["Sps-Custom-Header"]), code);
    for header in ["Content-Type", "Access-Control-Allow-Origin", "Accept", "authorization"] {
        harness.validate_failure(&headers(&[header]), code, Severity::Error, 1);
    }
}

#[test]
fn test_sensitive_data_in_headers() {
    let harness = harness();
    let code = "sps-sensitive-data-in-headers";

    harness.validate_success(&headers(&["SPS-Custom-Header-12345"]), code);
    harness.validate_failure(&headers(&["SPS-Token"]), code, Severity::Error, 1);
    harness.validate_failure(&headers(&["SPS-Token", "Password"]), code, Severity::Error, 2);
}

#[test]
fn test_location_header_only_on_created() {
    let harness = harness();
    let code = "sps-invalid-location-header";

    let created = r#"
      paths:
        /items:
          post:
            responses:
              '201':
                description: Item created
                headers:
                  Location:
                    schema:
                      type: string
    "#;
    harness.validate_success(created, code);
    harness.validate_success(&responses("post", &["201"]), code);
    harness.validate_success(&responses("get", &["200"]), code);

    let ok = r#"
      paths:
        /items/{itemId}:
          get:
            responses:
              '200':
                description: Successful response
                headers:
                  Location:
                    schema:
                      type: string
    "#;
    harness.validate_failure(ok, code, Severity::Error, 1);
}

#[test]
fn test_invalid_http_method() {
    let harness = harness();
    let code = "sps-invalid-http-method";

    let spec = r#"
      paths:
        /example:
          parameters: []
          x-internal: true
          get:
            summary: Example GET endpoint
          post:
            summary: Example POST endpoint
    "#;
    harness.validate_success(spec, code);

    let spec = r#"
      paths:
        /example:
          get:
            summary: Example GET endpoint
          INVALIDMETHOD:
            summary: Example endpoint with invalid HTTP method
    "#;
    harness.validate_failure(spec, code, Severity::Error, 1);
}

#[test]
fn test_invalid_mime_type() {
    let harness = harness();
    let code = "sps-invalid-mime-type";

    for mime in ["application/json", "application/vnd.sps-model+json", "application/vnd.sps-model.v1+json"] {
        harness.validate_success(&media_type(mime), code);
    }
    for mime in ["application/whatever", "sps/vnd.whatever+json", "application/vnd.whatever"] {
        harness.validate_failure(&media_type(mime), code, Severity::Error, 1);
    }
}

#[test]
fn test_no_resource_extensions() {
    let harness = harness();
    let code = "sps-no-resource-extensions";

    harness.validate_success(&media_type("application/json"), code);
    for path in ["/items.json", "/items.xml"] {
        let spec = format!("paths:\n  {}:\n    get:\n      summary: Items\n", path);
        harness.validate_failure(&spec, code, Severity::Error, 1);
    }
}

#[test]
fn test_invalid_status_code() {
    let harness = harness();
    let code = "sps-invalid-status-code";
    harness.validate_success(&responses("get", &["200", "404", "5XX", "default"]), code);
    harness.validate_failure(&responses("get", &["100"]), code, Severity::Error, 1);
}

#[test]
fn test_missing_success_responses() {
    let harness = harness();

    harness.validate_success(&responses("get", &["200", "201", "500"]), "sps-missing-2xx-response");
    harness.validate_failure(
        &responses("get", &["400", "500"]),
        "sps-missing-2xx-response",
        Severity::Error,
        1,
    );

    harness.validate_success(&responses("get", &["200"]), "sps-response-get-missing-success-code");
    harness.validate_failure(
        &responses("get", &["500", "404"]),
        "sps-response-get-missing-success-code",
        Severity::Error,
        1,
    );
}

#[test]
fn test_missing_500_response() {
    let harness = harness();
    let code = "sps-missing-500-response";

    let spec = r#"
      paths:
        /items:
          get:
            responses:
              '200':
                description: Successful response
              '500':
                description: Internal Server Error
        /users:
          post:
            responses:
              '201':
                description: User created
              '500':
                description: Internal Server Error
        /orders:
          put:
            responses:
              '204':
                description: Order updated
              '500':
                description: Internal Server Error
    "#;
    harness.validate_success(spec, code);

    let spec = r#"
      paths:
        /items:
          get:
            responses:
              '200':
                description: Successful response
              '500':
                description: Internal Server Error
        /users:
          post:
            responses:
              '201':
                description: User created
        /orders:
          put:
            responses:
              '204':
                description: Order updated
              '500':
                description: Internal Server Error
    "#;
    harness.validate_failure(spec, code, Severity::Warning, 1);
}

#[test]
fn test_method_success_codes() {
    let harness = harness();
    let cases: &[(&str, &str, &[&str], &[&[&str]])] = &[
        ("get", "sps-invalid-get-response-code", &["200", "404"], &[&["202"]]),
        ("head", "sps-invalid-head-response-code", &["200", "404"], &[&["201", "404"], &["202", "404"]]),
        ("options", "sps-invalid-options-response-code", &["200", "404"], &[&["201", "404"], &["202", "404"]]),
        ("put", "sps-invalid-put-response-code", &["204", "400"], &[&["200", "204"], &["201", "204"]]),
        ("patch", "sps-invalid-patch-response-code", &["202", "400"], &[&["201", "400"]]),
        ("delete", "sps-invalid-delete-response-code", &["202"], &[&["200", "202"], &["201", "202"]]),
        ("post", "sps-invalid-post-response-code", &["201", "400"], &[&["204"], &["412"]]),
    ];

    for (method, code, valid, invalid) in cases {
        harness.validate_success(&responses(method, valid), code);
        for codes in invalid.iter() {
            harness.validate_failure(&responses(method, codes), code, Severity::Warning, 1);
        }
    }
}

#[test]
fn test_response_body_must_be_object() {
    let harness = harness();
    let code = "sps-invalid-response-body";

    let spec = r#"
      paths:
        /example:
          get:
            responses:
              '200':
                description: Successful response
                content:
                  application/json:
                    schema:
                      type: object
                      properties:
                        messages:
                          type: array
                          items:
                            type: string
    "#;
    harness.validate_success(spec, code);

    let spec = r#"
      paths:
        /example:
          get:
            responses:
              '200':
                description: Successful response
                content:
                  application/json:
                    schema:
                      type: array
                      items:
                        type: string
    "#;
    harness.validate_failure(spec, code, Severity::Error, 1);
}

#[test]
fn test_request_bodies() {
    let harness = harness();
    let with_body = |method: &str| {
        format!(
            "paths:\n  /example:\n    {}:\n      requestBody:\n        content:\n          application/json:\n            schema:\n              type: object\n      responses:\n        '204':\n          description: No Content\n",
            method
        )
    };

    for (method, code) in [
        ("get", "sps-request-get-no-body"),
        ("head", "sps-request-head-no-body"),
        ("options", "sps-request-options-no-body"),
        ("delete", "sps-request-delete-invalid-body"),
    ] {
        harness.validate_success(&responses(method, &["204"]), code);
        harness.validate_failure(&with_body(method), code, Severity::Error, 1);
    }

    let code = "sps-request-patch-missing-body";
    harness.validate_success(&with_body("patch"), code);
    harness.validate_failure(&responses("patch", &["202"]), code, Severity::Error, 1);
}

#[test]
fn test_response_bodies() {
    let harness = harness();
    let with_content = |method: &str, status: &str| {
        format!(
            "paths:\n  /example:\n    {}:\n      responses:\n        '{}':\n          description: ok\n          content:\n            application/json:\n              schema:\n                type: object\n",
            method, status
        )
    };

    for (method, code) in [
        ("head", "sps-response-head-no-body"),
        ("options", "sps-response-options-no-body"),
        ("delete", "sps-response-delete-invalid-body"),
    ] {
        harness.validate_success(&with_content(method, "404"), code);
        harness.validate_failure(&with_content(method, "200"), code, Severity::Error, 1);
    }
}
