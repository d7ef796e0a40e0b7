//! Application relay: validate a submission, confirm its anti-bot token, and forward it
//! to the moderators' webhook.

pub mod domain;
pub mod notification;
pub mod router;
pub mod service;
pub mod validation;
pub mod verification;

#[cfg(test)]
mod tests;

pub use domain::{Application, ApplicationSubmission, ClientContext, Field};
pub use notification::{
    build_message, ApplicationNotifier, DiscordNotifier, NotifyError, WebhookMessage,
};
pub use router::{json_response, relay_router, APPLY_PATH};
pub use service::{outbound_client, RelayError, RelayService, RelaySettings};
pub use validation::{FieldPolicy, FieldRule, Requirement, ValidationError, ValidationPipeline};
pub use verification::{
    RejectionReason, TokenVerifier, TurnstileVerifier, VerificationOutcome, VerificationRequest,
    VerifyError,
};
