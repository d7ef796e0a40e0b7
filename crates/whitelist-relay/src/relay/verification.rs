use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Inputs for a single token check.
#[derive(Debug, Clone, Copy)]
pub struct VerificationRequest<'a> {
    pub token: &'a str,
    pub secret: &'a str,
    pub remote_ip: Option<&'a str>,
}

/// Result of asking the challenge service about a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    Rejected(RejectionReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// The service answered with a non-2xx status.
    HttpStatus(u16),
    /// The body was not the expected JSON document.
    MalformedResponse,
    /// The service reported `success` as anything other than `true`.
    NotVerified { error_codes: Vec<String> },
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("verification request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Anti-bot challenge verification boundary.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(
        &self,
        request: VerificationRequest<'_>,
    ) -> Result<VerificationOutcome, VerifyError>;
}

#[derive(Debug, Serialize)]
struct SiteVerifyForm<'a> {
    secret: &'a str,
    response: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    remoteip: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Turnstile `siteverify` client.
#[derive(Debug, Clone)]
pub struct TurnstileVerifier {
    client: Client,
    endpoint: String,
}

impl TurnstileVerifier {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl TokenVerifier for TurnstileVerifier {
    async fn verify(
        &self,
        request: VerificationRequest<'_>,
    ) -> Result<VerificationOutcome, VerifyError> {
        let form = SiteVerifyForm {
            secret: request.secret,
            response: request.token,
            remoteip: request.remote_ip,
        };

        let response = self.client.post(&self.endpoint).form(&form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Ok(VerificationOutcome::Rejected(RejectionReason::HttpStatus(
                status.as_u16(),
            )));
        }

        let body = response.bytes().await?;
        let outcome = match serde_json::from_slice::<SiteVerifyResponse>(&body) {
            Ok(parsed) if parsed.success => VerificationOutcome::Verified,
            Ok(parsed) => VerificationOutcome::Rejected(RejectionReason::NotVerified {
                error_codes: parsed.error_codes,
            }),
            Err(_) => VerificationOutcome::Rejected(RejectionReason::MalformedResponse),
        };
        Ok(outcome)
    }
}
