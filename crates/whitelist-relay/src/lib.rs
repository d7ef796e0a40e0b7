//! Whitelist application intake: request validation, anti-bot verification, and webhook relay.

pub mod client;
pub mod config;
pub mod error;
pub mod relay;
pub mod telemetry;
