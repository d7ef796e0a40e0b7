use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Status and decoded body returned by the relay.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Server-supplied error message, if the body carried one.
    pub fn error_message(&self) -> Option<&str> {
        self.body
            .get("error")
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
    }
}

/// Failure to get any response at all.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[async_trait]
pub trait ApplyTransport: Send + Sync {
    async fn post_json(&self, path: &str, payload: &Value) -> Result<TransportResponse, TransportError>;
}

/// Posts form payloads to a relay reachable at `base_url`.
#[derive(Debug, Clone)]
pub struct HttpApplyTransport {
    client: Client,
    base_url: String,
}

impl HttpApplyTransport {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ApplyTransport for HttpApplyTransport {
    async fn post_json(&self, path: &str, payload: &Value) -> Result<TransportResponse, TransportError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let response = self.client.post(url).json(payload).send().await?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice(&bytes).unwrap_or_else(|_| json!({}));

        Ok(TransportResponse { status, body })
    }
}
