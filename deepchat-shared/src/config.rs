use std::env;

use tracing::{info, warn};

use crate::credentials::Credentials;
use crate::DEFAULT_MODEL;

pub const ENDPOINT_VAR: &str = "AZURE_OPENAI_ENDPOINT";
pub const API_KEY_VAR: &str = "AZURE_OPENAI_API_KEY";
pub const MODEL_VAR: &str = "AZURE_OPENAI_MODEL";

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub credentials: Credentials,
    pub model: String,
}

impl ChatConfig {
    /// Reads `.env` (if any) and then the process environment. Missing
    /// credentials are not an error here; the gate rejects calls later.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let endpoint = lookup(ENDPOINT_VAR).filter(|v| !v.is_empty());
        let api_key = lookup(API_KEY_VAR).filter(|v| !v.is_empty());
        let model = lookup(MODEL_VAR)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let credentials = Credentials { endpoint, api_key };
        if credentials.is_ready() {
            info!("Azure OpenAI credentials loaded, model: {}", model);
        } else {
            warn!("{} or {} is not set; chat calls will be rejected", ENDPOINT_VAR, API_KEY_VAR);
        }

        Self { credentials, model }
    }
}

/// Parses a boolean-ish environment value. Unknown values fall back to `default`.
pub fn parse_flag(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
