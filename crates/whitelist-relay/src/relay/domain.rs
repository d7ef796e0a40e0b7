use axum::http::HeaderMap;
use serde_json::{Map, Value};

use super::validation::ValidationError;

/// Header set by the edge proxy with the applicant's address.
pub const CONNECTING_IP_HEADER: &str = "cf-connecting-ip";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
const USER_AGENT_HEADER: &str = "user-agent";

/// Form fields understood by the relay, keyed by their inbound JSON name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Minecraft,
    Email,
    Discord,
    Reddit,
    NotifyEmail,
    FoundVia,
    VerificationToken,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Minecraft,
        Field::Email,
        Field::Discord,
        Field::Reddit,
        Field::NotifyEmail,
        Field::FoundVia,
        Field::VerificationToken,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            Field::Minecraft => "minecraft",
            Field::Email => "email",
            Field::Discord => "discord",
            Field::Reddit => "reddit",
            Field::NotifyEmail => "notifyEmail",
            Field::FoundVia => "foundVia",
            Field::VerificationToken => "cf-turnstile-response",
        }
    }
}

/// Applicant input as posted by the form, trimmed, with blank values dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationSubmission {
    pub minecraft: Option<String>,
    pub email: Option<String>,
    pub discord: Option<String>,
    pub reddit: Option<String>,
    pub notify_email: Option<String>,
    pub found_via: Option<String>,
    pub turnstile_token: Option<String>,
}

impl ApplicationSubmission {
    /// Extract known fields from a decoded JSON body. Unknown keys are ignored;
    /// `null` is treated as absent and any other non-string value is rejected.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let object = value.as_object().ok_or(ValidationError::InvalidJson)?;

        let mut submission = Self::default();
        for field in Field::ALL {
            let parsed = string_field(object, field)?;
            *submission.slot_mut(field) = parsed;
        }
        Ok(submission)
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        let slot = match field {
            Field::Minecraft => &self.minecraft,
            Field::Email => &self.email,
            Field::Discord => &self.discord,
            Field::Reddit => &self.reddit,
            Field::NotifyEmail => &self.notify_email,
            Field::FoundVia => &self.found_via,
            Field::VerificationToken => &self.turnstile_token,
        };
        slot.as_deref()
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Minecraft => &mut self.minecraft,
            Field::Email => &mut self.email,
            Field::Discord => &mut self.discord,
            Field::Reddit => &mut self.reddit,
            Field::NotifyEmail => &mut self.notify_email,
            Field::FoundVia => &mut self.found_via,
            Field::VerificationToken => &mut self.turnstile_token,
        }
    }
}

fn string_field(object: &Map<String, Value>, field: Field) -> Result<Option<String>, ValidationError> {
    match object.get(field.wire_name()) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => {
            let trimmed = raw.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(_) => Err(ValidationError::FieldType(field)),
    }
}

/// Transport metadata captured alongside the submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientContext {
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &'static str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let source_ip = header(CONNECTING_IP_HEADER)
            .or_else(|| {
                header(FORWARDED_FOR_HEADER)
                    .and_then(|chain| chain.split(',').next())
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
            })
            .map(str::to_string);

        let user_agent = header(USER_AGENT_HEADER).map(str::to_string);

        Self {
            source_ip,
            user_agent,
        }
    }
}

/// A submission that passed every field rule, enriched with transport metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub minecraft_username: String,
    pub email: Option<String>,
    pub discord_handle: Option<String>,
    pub reddit_handle: Option<String>,
    pub notify_email: Option<String>,
    pub found_via: Option<String>,
    pub verification_token: Option<String>,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl Application {
    pub fn title(&self) -> String {
        format!("Application: {}", self.minecraft_username)
    }
}
