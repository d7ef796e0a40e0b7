use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use serde_json::{json, Value};

use crate::config::{MissingSettings, RelayCredentials};
use crate::relay::domain::ApplicationSubmission;
use crate::relay::notification::{ApplicationNotifier, NotifyError, WebhookMessage};
use crate::relay::service::{RelayService, RelaySettings};
use crate::relay::verification::{
    RejectionReason, TokenVerifier, VerificationOutcome, VerificationRequest, VerifyError,
};

pub(super) const SECRET: &str = "turnstile-secret";
pub(super) const WEBHOOK_URL: &str = "https://discord.test/api/webhooks/1/abc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SeenVerification {
    pub token: String,
    pub secret: String,
    pub remote_ip: Option<String>,
}

/// Verifier double with a fixed answer that records every call.
pub(super) struct CountingVerifier {
    accept: bool,
    panic: bool,
    calls: AtomicUsize,
    seen: Mutex<Vec<SeenVerification>>,
}

impl CountingVerifier {
    pub fn accepting() -> Self {
        Self::with(true, false)
    }

    pub fn rejecting() -> Self {
        Self::with(false, false)
    }

    pub fn panicking() -> Self {
        Self::with(true, true)
    }

    fn with(accept: bool, panic: bool) -> Self {
        Self {
            accept,
            panic,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<SeenVerification> {
        self.seen.lock().expect("verifier mutex poisoned").clone()
    }
}

#[async_trait]
impl TokenVerifier for CountingVerifier {
    async fn verify(
        &self,
        request: VerificationRequest<'_>,
    ) -> Result<VerificationOutcome, VerifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .expect("verifier mutex poisoned")
            .push(SeenVerification {
                token: request.token.to_string(),
                secret: request.secret.to_string(),
                remote_ip: request.remote_ip.map(str::to_string),
            });
        if self.panic {
            panic!("verifier exploded");
        }
        if self.accept {
            Ok(VerificationOutcome::Verified)
        } else {
            Ok(VerificationOutcome::Rejected(RejectionReason::NotVerified {
                error_codes: vec!["invalid-input-response".to_string()],
            }))
        }
    }
}

/// Notifier double that answers with a fixed webhook status.
pub(super) struct RecordingNotifier {
    status: u16,
    body: String,
    messages: Mutex<Vec<(String, WebhookMessage)>>,
}

impl RecordingNotifier {
    pub fn ok() -> Self {
        Self::answering(204, "")
    }

    pub fn answering(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.messages.lock().expect("notifier mutex poisoned").len()
    }

    pub fn messages(&self) -> Vec<(String, WebhookMessage)> {
        self.messages.lock().expect("notifier mutex poisoned").clone()
    }
}

#[async_trait]
impl ApplicationNotifier for RecordingNotifier {
    async fn notify(&self, webhook_url: &str, message: &WebhookMessage) -> Result<(), NotifyError> {
        self.messages
            .lock()
            .expect("notifier mutex poisoned")
            .push((webhook_url.to_string(), message.clone()));
        if (200..300).contains(&self.status) {
            Ok(())
        } else {
            Err(NotifyError::Rejected {
                status: self.status,
                snippet: self.body.clone(),
            })
        }
    }
}

pub(super) fn credentials() -> RelayCredentials {
    RelayCredentials {
        turnstile_secret: SECRET.to_string(),
        webhook_url: WEBHOOK_URL.to_string(),
    }
}

pub(super) fn settings() -> RelaySettings {
    RelaySettings::with_credentials(credentials())
}

pub(super) fn misconfigured_settings() -> RelaySettings {
    RelaySettings {
        credentials: Err(MissingSettings(vec!["TURNSTILE_SECRET"])),
        ..settings()
    }
}

pub(super) type TestService = RelayService<CountingVerifier, RecordingNotifier>;

pub(super) fn build_service(
    settings: RelaySettings,
    verifier: CountingVerifier,
    notifier: RecordingNotifier,
) -> (Arc<TestService>, Arc<CountingVerifier>, Arc<RecordingNotifier>) {
    let verifier = Arc::new(verifier);
    let notifier = Arc::new(notifier);
    let service = Arc::new(RelayService::new(
        settings,
        verifier.clone(),
        notifier.clone(),
    ));
    (service, verifier, notifier)
}

pub(super) fn submission() -> ApplicationSubmission {
    ApplicationSubmission {
        minecraft: Some("Steve_01".to_string()),
        email: Some("steve@example.com".to_string()),
        discord: Some("steve".to_string()),
        reddit: None,
        notify_email: None,
        found_via: Some("Server list".to_string()),
        turnstile_token: Some("token-123".to_string()),
    }
}

pub(super) fn payload() -> Value {
    json!({
        "minecraft": "Steve_01",
        "email": "steve@example.com",
        "discord": "steve",
        "foundVia": "Server list",
        "cf-turnstile-response": "token-123",
        "agree": "on",
    })
}

pub(super) fn post_json(body: &Value) -> Request<Body> {
    Request::post(crate::relay::router::APPLY_PATH)
        .header(header::CONTENT_TYPE, "application/json")
        .header("cf-connecting-ip", "203.0.113.7")
        .header(header::USER_AGENT, "integration-test/1.0")
        .body(Body::from(serde_json::to_vec(body).expect("payload serializes")))
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}
