use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::relay::validation::{FieldPolicy, Requirement};

pub const DEFAULT_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";
pub const DEFAULT_BOT_NAME: &str = "Whitelist Bot";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub relay: RelayConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let outbound_timeout = match non_empty_var("RELAY_OUTBOUND_TIMEOUT_SECS") {
            Some(raw) => Some(
                raw.parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| ConfigError::InvalidTimeout)?,
            ),
            None => None,
        };

        let relay = RelayConfig {
            turnstile_secret: non_empty_var("TURNSTILE_SECRET"),
            webhook_url: non_empty_var("DISCORD_WEBHOOK_URL"),
            verify_url: non_empty_var("TURNSTILE_VERIFY_URL")
                .unwrap_or_else(|| DEFAULT_VERIFY_URL.to_string()),
            bot_name: non_empty_var("RELAY_BOT_NAME")
                .unwrap_or_else(|| DEFAULT_BOT_NAME.to_string()),
            field_policy: FieldPolicy {
                email: requirement_var("RELAY_REQUIRE_EMAIL")?,
                found_via: requirement_var("RELAY_REQUIRE_FOUND_VIA")?,
            },
            outbound_timeout,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            relay,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn requirement_var(key: &'static str) -> Result<Requirement, ConfigError> {
    match non_empty_var(key).map(|value| value.to_ascii_lowercase()) {
        None => Ok(Requirement::Optional),
        Some(value) => match value.as_str() {
            "1" | "true" | "yes" | "required" => Ok(Requirement::Required),
            "0" | "false" | "no" | "optional" => Ok(Requirement::Optional),
            _ => Err(ConfigError::InvalidFlag { key }),
        },
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Outbound integrations and intake policy for the relay route.
#[derive(Clone)]
pub struct RelayConfig {
    pub turnstile_secret: Option<String>,
    pub webhook_url: Option<String>,
    pub verify_url: String,
    pub bot_name: String,
    pub field_policy: FieldPolicy,
    pub outbound_timeout: Option<Duration>,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("turnstile_secret", &self.turnstile_secret.as_ref().map(|_| "<redacted>"))
            .field("webhook_url", &self.webhook_url.as_ref().map(|_| "<redacted>"))
            .field("verify_url", &self.verify_url)
            .field("bot_name", &self.bot_name)
            .field("field_policy", &self.field_policy)
            .field("outbound_timeout", &self.outbound_timeout)
            .finish()
    }
}

impl RelayConfig {
    /// Resolve the secrets the relay cannot operate without.
    ///
    /// Returns the names of every missing setting so operators can fix them in one pass.
    pub fn credentials(&self) -> Result<RelayCredentials, MissingSettings> {
        match (&self.turnstile_secret, &self.webhook_url) {
            (Some(secret), Some(webhook_url)) => Ok(RelayCredentials {
                turnstile_secret: secret.clone(),
                webhook_url: webhook_url.clone(),
            }),
            (secret, webhook_url) => {
                let mut missing = Vec::new();
                if secret.is_none() {
                    missing.push("TURNSTILE_SECRET");
                }
                if webhook_url.is_none() {
                    missing.push("DISCORD_WEBHOOK_URL");
                }
                Err(MissingSettings(missing))
            }
        }
    }
}

/// Secrets required before any outbound call may be attempted.
#[derive(Clone, PartialEq, Eq)]
pub struct RelayCredentials {
    pub turnstile_secret: String,
    pub webhook_url: String,
}

impl fmt::Debug for RelayCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RelayCredentials { .. }")
    }
}

/// Names of relay settings absent from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingSettings(pub Vec<&'static str>);

impl fmt::Display for MissingSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing {}", self.0.join(", "))
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InvalidFlag { key: &'static str },
    MissingCredentials(MissingSettings),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "RELAY_OUTBOUND_TIMEOUT_SECS must be a whole number of seconds")
            }
            ConfigError::InvalidFlag { key } => {
                write!(f, "{key} must be one of true/false/required/optional")
            }
            ConfigError::MissingCredentials(missing) => {
                write!(f, "relay credentials not configured ({missing})")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout
            | ConfigError::InvalidFlag { .. }
            | ConfigError::MissingCredentials(_) => None,
        }
    }
}
