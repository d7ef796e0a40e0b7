use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::{MissingSettings, RelayConfig, RelayCredentials, DEFAULT_BOT_NAME};

use super::domain::{ApplicationSubmission, ClientContext};
use super::notification::{build_message, ApplicationNotifier, NotifyError};
use super::validation::{FieldPolicy, ValidationError, ValidationPipeline};
use super::verification::{TokenVerifier, VerificationOutcome, VerificationRequest, VerifyError};

/// Everything the relay needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub pipeline: ValidationPipeline,
    pub bot_name: String,
    pub credentials: Result<RelayCredentials, MissingSettings>,
}

impl RelaySettings {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            pipeline: ValidationPipeline::from_policy(config.field_policy),
            bot_name: config.bot_name.clone(),
            credentials: config.credentials(),
        }
    }

    pub fn with_credentials(credentials: RelayCredentials) -> Self {
        Self {
            pipeline: ValidationPipeline::from_policy(FieldPolicy::default()),
            bot_name: DEFAULT_BOT_NAME.to_string(),
            credentials: Ok(credentials),
        }
    }
}

/// Build the shared outbound HTTP client. Without a timeout the client default applies.
pub fn outbound_client(timeout: Option<Duration>) -> Result<Client, reqwest::Error> {
    let builder = Client::builder();
    let builder = match timeout {
        Some(timeout) => builder.timeout(timeout),
        None => builder,
    };
    builder.build()
}

/// Error raised by the relay; each variant maps to one HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Server misconfigured")]
    Misconfigured(MissingSettings),
    #[error("Anti-bot verification failed.")]
    VerificationFailed,
    #[error("Failed to notify moderators.")]
    NotificationRejected { status: u16, snippet: String },
    #[error("Internal error")]
    Unexpected(String),
}

impl RelayError {
    /// Operator-facing detail attached to server-side failures.
    pub fn detail(&self) -> Option<String> {
        match self {
            RelayError::Misconfigured(missing) => Some(missing.to_string()),
            RelayError::NotificationRejected { status, snippet } => {
                Some(format!("webhook returned {status}: {snippet}"))
            }
            RelayError::Unexpected(detail) => Some(detail.clone()),
            RelayError::Validation(_) | RelayError::VerificationFailed => None,
        }
    }
}

impl From<VerifyError> for RelayError {
    fn from(value: VerifyError) -> Self {
        Self::Unexpected(value.to_string())
    }
}

impl From<NotifyError> for RelayError {
    fn from(value: NotifyError) -> Self {
        match value {
            NotifyError::Rejected { status, snippet } => {
                Self::NotificationRejected { status, snippet }
            }
            transport @ NotifyError::Transport(_) => Self::Unexpected(transport.to_string()),
        }
    }
}

/// Validates an application, confirms its anti-bot token, then forwards it to the webhook.
pub struct RelayService<V, N> {
    settings: RelaySettings,
    verifier: Arc<V>,
    notifier: Arc<N>,
}

impl<V, N> RelayService<V, N>
where
    V: TokenVerifier + 'static,
    N: ApplicationNotifier + 'static,
{
    pub fn new(settings: RelaySettings, verifier: Arc<V>, notifier: Arc<N>) -> Self {
        Self {
            settings,
            verifier,
            notifier,
        }
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Relay one submission. The notifier is only reached after the verifier confirmed the token.
    pub async fn relay(
        &self,
        submission: ApplicationSubmission,
        context: ClientContext,
    ) -> Result<(), RelayError> {
        let application = self
            .settings
            .pipeline
            .validate(submission, context)
            .inspect_err(|err| debug!(error = %err, "application rejected by validation"))?;

        let credentials = self.settings.credentials.as_ref().map_err(|missing| {
            warn!(%missing, "relay credentials missing; refusing application");
            RelayError::Misconfigured(missing.clone())
        })?;

        let Some(token) = application.verification_token.as_deref() else {
            info!(username = %application.minecraft_username, "application missing anti-bot token");
            return Err(RelayError::VerificationFailed);
        };

        let outcome = self
            .verifier
            .verify(VerificationRequest {
                token,
                secret: &credentials.turnstile_secret,
                remote_ip: application.source_ip.as_deref(),
            })
            .await?;

        if let VerificationOutcome::Rejected(reason) = outcome {
            info!(username = %application.minecraft_username, ?reason, "anti-bot verification rejected");
            return Err(RelayError::VerificationFailed);
        }

        let message = build_message(&self.settings.bot_name, &application, Utc::now());
        self.notifier
            .notify(&credentials.webhook_url, &message)
            .await
            .inspect_err(|err| warn!(error = %err, "webhook notification failed"))?;

        info!(username = %application.minecraft_username, "application relayed");
        Ok(())
    }
}
