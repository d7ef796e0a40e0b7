use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::transport::{ApplyTransport, TransportError, TransportResponse};
use crate::relay::router::APPLY_PATH;

pub const TOKEN_FIELD: &str = "cf-turnstile-response";
pub const AGREE_FIELD: &str = "agree";

pub const MISSING_TOKEN_MESSAGE: &str = "Please complete the anti-bot check and try again.";
pub const AGREEMENT_MESSAGE: &str = "Please agree to the Terms of Service to continue.";
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please refresh and try again.";
pub const SUCCESS_MESSAGE: &str = "Your response has been recorded ✅ (We’ll review it soon!)";

/// Field values as the form would serialize them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyForm {
    fields: BTreeMap<String, String>,
}

impl ApplyForm {
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    fn has_value(&self, name: &str) -> bool {
        self.get(name).is_some_and(|value| !value.is_empty())
    }

    /// Every field as a flat JSON object of strings.
    pub fn to_payload(&self) -> Value {
        let object: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect();
        Value::Object(object)
    }
}

/// What the page shows; the submit control is disabled only while `Submitting`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormState {
    #[default]
    Idle,
    Submitting,
    Success(String),
    Error(String),
}

impl FormState {
    pub fn status_text(&self) -> &str {
        match self {
            FormState::Idle | FormState::Submitting => "",
            FormState::Success(message) | FormState::Error(message) => message,
        }
    }
}

/// Why a submit attempt never left the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitBlocked {
    InFlight,
    MissingToken,
    AgreementRequired,
}

/// Drives one application form through idle, submitting, success and error states.
pub struct FormController<T> {
    transport: T,
    form: ApplyForm,
    state: FormState,
    require_agreement: bool,
}

impl<T: ApplyTransport> FormController<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            form: ApplyForm::default(),
            state: FormState::Idle,
            require_agreement: false,
        }
    }

    /// Require the terms checkbox before anything is sent.
    pub fn requiring_agreement(mut self) -> Self {
        self.require_agreement = true;
        self
    }

    pub fn form(&self) -> &ApplyForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ApplyForm {
        &mut self.form
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn submit_enabled(&self) -> bool {
        self.state != FormState::Submitting
    }

    /// Run the local presence checks and move to `Submitting`, returning the payload to send.
    pub fn begin(&mut self) -> Result<Value, SubmitBlocked> {
        if self.state == FormState::Submitting {
            return Err(SubmitBlocked::InFlight);
        }

        if !self.form.has_value(TOKEN_FIELD) {
            self.state = FormState::Error(MISSING_TOKEN_MESSAGE.to_string());
            return Err(SubmitBlocked::MissingToken);
        }

        if self.require_agreement && !self.form.has_value(AGREE_FIELD) {
            self.state = FormState::Error(AGREEMENT_MESSAGE.to_string());
            return Err(SubmitBlocked::AgreementRequired);
        }

        self.state = FormState::Submitting;
        Ok(self.form.to_payload())
    }

    /// Apply the relay's answer to the page.
    pub fn complete(&mut self, outcome: Result<TransportResponse, TransportError>) -> &FormState {
        self.state = match outcome {
            Ok(response) if response.is_success() => {
                self.form.clear();
                FormState::Success(SUCCESS_MESSAGE.to_string())
            }
            Ok(response) => {
                let message = response
                    .error_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Submission failed (HTTP {}).", response.status));
                FormState::Error(message)
            }
            Err(err) => {
                tracing::debug!(error = %err, "application submit failed in transport");
                FormState::Error(NETWORK_ERROR_MESSAGE.to_string())
            }
        };
        &self.state
    }

    /// Submit the current form to the relay and return the resulting state.
    pub async fn submit(&mut self) -> &FormState {
        let payload = match self.begin() {
            Ok(payload) => payload,
            Err(_) => return &self.state,
        };

        let outcome = self.transport.post_json(APPLY_PATH, &payload).await;
        self.complete(outcome)
    }
}
