use axum::http::{header, HeaderMap, HeaderValue};

use super::common::submission;
use crate::relay::domain::{ClientContext, Field};
use crate::relay::validation::{
    is_valid_email, parse_submission, FieldPolicy, FieldRule, Requirement, ValidationError,
    ValidationPipeline, FOUND_VIA_MAX_CHARS,
};

fn json_headers(content_type: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers
}

#[test]
fn default_policy_only_requires_username() {
    let pipeline = ValidationPipeline::default();
    assert_eq!(
        pipeline.rules(),
        &[
            FieldRule::Present(Field::Minecraft),
            FieldRule::MinecraftUsername,
            FieldRule::Email(Field::Email),
            FieldRule::MaxChars(Field::FoundVia, FOUND_VIA_MAX_CHARS),
        ]
    );

    let mut minimal = submission();
    minimal.email = None;
    minimal.found_via = None;
    let application = pipeline
        .validate(minimal, ClientContext::default())
        .expect("username alone is enough");
    assert_eq!(application.minecraft_username, "Steve_01");
    assert!(application.email.is_none());
}

#[test]
fn strict_policy_requires_email_and_found_via_in_order() {
    let pipeline = ValidationPipeline::from_policy(FieldPolicy {
        email: Requirement::Required,
        found_via: Requirement::Required,
    });

    let mut missing_both = submission();
    missing_both.email = None;
    missing_both.found_via = None;
    let err = pipeline
        .validate(missing_both, ClientContext::default())
        .expect_err("email required");
    assert!(matches!(err, ValidationError::MissingField(Field::Email)));
    assert_eq!(err.to_string(), "Missing required field: email.");

    let mut missing_found_via = submission();
    missing_found_via.found_via = None;
    let err = pipeline
        .validate(missing_found_via, ClientContext::default())
        .expect_err("foundVia required");
    assert_eq!(err.to_string(), "Missing required field: foundVia.");
}

#[test]
fn missing_username_is_reported_before_other_rules() {
    let mut input = submission();
    input.minecraft = None;
    input.email = Some("not-an-email".to_string());
    let err = ValidationPipeline::default()
        .validate(input, ClientContext::default())
        .expect_err("username required");
    assert!(matches!(err, ValidationError::MissingField(Field::Minecraft)));
}

#[test]
fn usernames_must_match_pattern() {
    for name in ["ab", "this_name_is_way_too_long", "bad name", "dash-name", "émile"] {
        let mut input = submission();
        input.minecraft = Some(name.to_string());
        let err = ValidationPipeline::default()
            .validate(input, ClientContext::default())
            .expect_err("invalid username rejected");
        assert!(
            matches!(err, ValidationError::InvalidUsername),
            "{name} should be rejected"
        );
    }

    for name in ["abc", "Notch", "under_score_1234"] {
        let mut input = submission();
        input.minecraft = Some(name.to_string());
        assert!(ValidationPipeline::default()
            .validate(input, ClientContext::default())
            .is_ok());
    }
}

#[test]
fn email_shape_and_length_are_checked_when_present() {
    assert!(is_valid_email("a@b.co"));
    assert!(!is_valid_email("not-an-email"));
    assert!(!is_valid_email("two words@example.com"));
    assert!(!is_valid_email("a@b"));

    let long_local = "a".repeat(250);
    assert!(!is_valid_email(&format!("{long_local}@b.co")));

    let mut input = submission();
    input.email = Some("not-an-email".to_string());
    let err = ValidationPipeline::default()
        .validate(input, ClientContext::default())
        .expect_err("bad email rejected");
    assert_eq!(err.to_string(), "Invalid email.");
}

#[test]
fn found_via_is_capped() {
    let mut input = submission();
    input.found_via = Some("x".repeat(FOUND_VIA_MAX_CHARS));
    assert!(ValidationPipeline::default()
        .validate(input, ClientContext::default())
        .is_ok());

    let mut input = submission();
    input.found_via = Some("x".repeat(FOUND_VIA_MAX_CHARS + 1));
    let err = ValidationPipeline::default()
        .validate(input, ClientContext::default())
        .expect_err("too long");
    assert!(matches!(err, ValidationError::MessageTooLong));
    assert_eq!(err.to_string(), "Message too long.");
}

#[test]
fn custom_rule_lists_are_applied_in_order() {
    let pipeline = ValidationPipeline::new(vec![
        FieldRule::Present(Field::Minecraft),
        FieldRule::MaxChars(Field::Discord, 3),
    ]);
    let err = pipeline
        .validate(submission(), ClientContext::default())
        .expect_err("discord handle too long");
    assert!(matches!(err, ValidationError::TooLong { field: Field::Discord, .. }));
}

#[test]
fn validated_application_carries_transport_metadata() {
    let context = ClientContext {
        source_ip: Some("198.51.100.2".to_string()),
        user_agent: Some("curl/8".to_string()),
    };
    let application = ValidationPipeline::default()
        .validate(submission(), context)
        .expect("valid");
    assert_eq!(application.source_ip.as_deref(), Some("198.51.100.2"));
    assert_eq!(application.user_agent.as_deref(), Some("curl/8"));
    assert_eq!(application.verification_token.as_deref(), Some("token-123"));
    assert_eq!(application.title(), "Application: Steve_01");
}

#[test]
fn parse_requires_json_content_type() {
    let body = br#"{"minecraft":"Steve"}"#;

    let err = parse_submission(&HeaderMap::new(), body).expect_err("no content type");
    assert!(matches!(err, ValidationError::UnsupportedContentType));

    let err = parse_submission(&json_headers("text/plain"), body).expect_err("wrong type");
    assert_eq!(err.to_string(), "Expected application/json");

    let parsed = parse_submission(&json_headers("application/json; charset=utf-8"), body)
        .expect("charset parameter accepted");
    assert_eq!(parsed.minecraft.as_deref(), Some("Steve"));
}

#[test]
fn parse_rejects_malformed_json() {
    let err = parse_submission(&json_headers("application/json"), b"{not json")
        .expect_err("malformed body");
    assert_eq!(err.to_string(), "Invalid JSON");

    let err = parse_submission(&json_headers("application/json"), b"\"just a string\"")
        .expect_err("non-object body");
    assert!(matches!(err, ValidationError::InvalidJson));
}
