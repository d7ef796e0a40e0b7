use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::domain::Application;

pub const PLACEHOLDER: &str = "(none)";
pub const USER_AGENT_MAX_CHARS: usize = 120;
pub const RESPONSE_SNIPPET_MAX_CHARS: usize = 200;
pub const MESSAGE_CONTENT: &str = "New whitelist application received ✅";

/// Chat webhook message carrying one embed per application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookMessage {
    pub username: String,
    pub content: String,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    fn new(name: &str, value: Option<&str>, inline: bool) -> Self {
        Self {
            name: name.to_string(),
            value: value.unwrap_or(PLACEHOLDER).to_string(),
            inline,
        }
    }
}

/// Render an accepted application as a webhook message.
pub fn build_message(
    bot_name: &str,
    application: &Application,
    received_at: DateTime<Utc>,
) -> WebhookMessage {
    let user_agent = application
        .user_agent
        .as_deref()
        .map(|agent| truncate_chars(agent, USER_AGENT_MAX_CHARS));
    let timestamp = received_at.to_rfc3339_opts(SecondsFormat::Millis, true);

    let fields = vec![
        EmbedField::new("Minecraft", Some(application.minecraft_username.as_str()), true),
        EmbedField::new("Email", application.email.as_deref(), true),
        EmbedField::new("Discord", application.discord_handle.as_deref(), true),
        EmbedField::new("Reddit", application.reddit_handle.as_deref(), true),
        EmbedField::new("Notify Email", application.notify_email.as_deref(), true),
        EmbedField::new("Found via", application.found_via.as_deref(), false),
        EmbedField::new(
            "IP",
            Some(application.source_ip.as_deref().unwrap_or("unknown")),
            true,
        ),
        EmbedField::new("User-Agent", user_agent.as_deref(), false),
        EmbedField::new("Time (UTC)", Some(timestamp.as_str()), true),
    ];

    WebhookMessage {
        username: bot_name.to_string(),
        content: MESSAGE_CONTENT.to_string(),
        embeds: vec![Embed {
            title: application.title(),
            fields,
        }],
    }
}

pub(crate) fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("webhook returned {status}: {snippet}")]
    Rejected { status: u16, snippet: String },
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Outbound notification boundary.
#[async_trait]
pub trait ApplicationNotifier: Send + Sync {
    async fn notify(&self, webhook_url: &str, message: &WebhookMessage) -> Result<(), NotifyError>;
}

/// Posts messages to a Discord-compatible webhook.
#[derive(Debug, Clone)]
pub struct DiscordNotifier {
    client: Client,
}

impl DiscordNotifier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ApplicationNotifier for DiscordNotifier {
    async fn notify(&self, webhook_url: &str, message: &WebhookMessage) -> Result<(), NotifyError> {
        let response = self.client.post(webhook_url).json(message).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            snippet: truncate_chars(&body, RESPONSE_SNIPPET_MAX_CHARS),
        })
    }
}
