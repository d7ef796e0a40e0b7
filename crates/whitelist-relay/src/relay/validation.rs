use std::sync::OnceLock;

use axum::http::{header, HeaderMap};
use regex::Regex;
use serde_json::Value;

use super::domain::{Application, ApplicationSubmission, ClientContext, Field};

pub const EMAIL_MAX_CHARS: usize = 254;
pub const FOUND_VIA_MAX_CHARS: usize = 500;

/// Validation errors reported back to the applicant with HTTP 400.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Expected application/json")]
    UnsupportedContentType,
    #[error("Invalid JSON")]
    InvalidJson,
    #[error("Invalid value for field: {}.", .0.wire_name())]
    FieldType(Field),
    #[error("Missing required field: {}.", .0.wire_name())]
    MissingField(Field),
    #[error("Invalid Minecraft username.")]
    InvalidUsername,
    #[error("Invalid email.")]
    InvalidEmail(Field),
    #[error("Field {} is too long (max {limit} characters).", .field.wire_name())]
    TooLong { field: Field, limit: usize },
    #[error("Message too long.")]
    MessageTooLong,
}

/// Whether an optional form field must be supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Requirement {
    Required,
    #[default]
    Optional,
}

/// Intake policy for fields whose requirement differs between form revisions.
///
/// The username and verification token are always needed; the token is checked
/// by the verification step rather than here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldPolicy {
    pub email: Requirement,
    pub found_via: Requirement,
}

/// A single check applied to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Present(Field),
    MinecraftUsername,
    Email(Field),
    MaxChars(Field, usize),
}

impl FieldRule {
    fn check(&self, submission: &ApplicationSubmission) -> Result<(), ValidationError> {
        match *self {
            FieldRule::Present(field) => submission
                .get(field)
                .map(|_| ())
                .ok_or(ValidationError::MissingField(field)),
            FieldRule::MinecraftUsername => match submission.get(Field::Minecraft) {
                Some(name) if !is_valid_username(name) => {
                    Err(ValidationError::InvalidUsername)
                }
                _ => Ok(()),
            },
            FieldRule::Email(field) => match submission.get(field) {
                Some(email) if !is_valid_email(email) => Err(ValidationError::InvalidEmail(field)),
                _ => Ok(()),
            },
            FieldRule::MaxChars(field, limit) => match submission.get(field) {
                Some(value) if value.chars().count() > limit => match field {
                    Field::FoundVia => Err(ValidationError::MessageTooLong),
                    _ => Err(ValidationError::TooLong { field, limit }),
                },
                _ => Ok(()),
            },
        }
    }
}

/// Ordered list of field rules; the first failing rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPipeline {
    rules: Vec<FieldRule>,
}

impl ValidationPipeline {
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    pub fn from_policy(policy: FieldPolicy) -> Self {
        let mut rules = vec![FieldRule::Present(Field::Minecraft)];
        if policy.email == Requirement::Required {
            rules.push(FieldRule::Present(Field::Email));
        }
        if policy.found_via == Requirement::Required {
            rules.push(FieldRule::Present(Field::FoundVia));
        }
        rules.extend([
            FieldRule::MinecraftUsername,
            FieldRule::Email(Field::Email),
            FieldRule::MaxChars(Field::FoundVia, FOUND_VIA_MAX_CHARS),
        ]);
        Self { rules }
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn validate(
        &self,
        submission: ApplicationSubmission,
        context: ClientContext,
    ) -> Result<Application, ValidationError> {
        for rule in &self.rules {
            rule.check(&submission)?;
        }

        let ApplicationSubmission {
            minecraft,
            email,
            discord,
            reddit,
            notify_email,
            found_via,
            turnstile_token,
        } = submission;

        Ok(Application {
            minecraft_username: minecraft.ok_or(ValidationError::MissingField(Field::Minecraft))?,
            email,
            discord_handle: discord,
            reddit_handle: reddit,
            notify_email,
            found_via,
            verification_token: turnstile_token,
            source_ip: context.source_ip,
            user_agent: context.user_agent,
        })
    }
}

impl Default for ValidationPipeline {
    fn default() -> Self {
        Self::from_policy(FieldPolicy::default())
    }
}

/// Check the declared content type and decode the body into a submission.
pub fn parse_submission(
    headers: &HeaderMap,
    body: &[u8],
) -> Result<ApplicationSubmission, ValidationError> {
    let declares_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<mime::Mime>().ok())
        .map(|parsed| parsed.essence_str() == mime::APPLICATION_JSON.essence_str())
        .unwrap_or(false);
    if !declares_json {
        return Err(ValidationError::UnsupportedContentType);
    }

    let value: Value = serde_json::from_slice(body).map_err(|_| ValidationError::InvalidJson)?;
    ApplicationSubmission::from_json(&value)
}

pub fn is_valid_username(name: &str) -> bool {
    username_pattern().is_match(name)
}

pub fn is_valid_email(email: &str) -> bool {
    email.chars().count() <= EMAIL_MAX_CHARS && email_pattern().is_match(email)
}

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]{3,16}$").expect("username pattern compiles"))
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"))
}
