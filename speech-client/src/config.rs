use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, SpeechError};

/// Environment variables checked for the bearer credential, in order
pub const API_KEY_ENV_VARS: &[&str] = &["OPEN_AI_BEARER_TOKEN", "OPENAI_API_KEY"];

/// Connection and voice settings for the speech endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Synthesis endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Voice selection sent with every request
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// API key (optional, can use env var instead)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/audio/speech".to_string()
}

fn default_model() -> String {
    "tts-1".to_string()
}

fn default_voice() -> String {
    "nova".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            voice: default_voice(),
            request_timeout_secs: default_request_timeout_secs(),
            api_key: None,
        }
    }
}

impl SpeechConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve the bearer credential from config, falling back to the environment.
    pub fn resolve_api_key(&self) -> Result<String> {
        let lookup = |name: &str| std::env::var(name).ok();
        self.resolve_api_key_with(lookup)
    }

    fn resolve_api_key_with<F>(&self, lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = self
            .api_key
            .clone()
            .or_else(|| API_KEY_ENV_VARS.iter().find_map(|name| lookup(name)));

        match raw.map(|key| sanitize_api_key(&key)) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(SpeechError::MissingApiKey {
                env_var: API_KEY_ENV_VARS[0].to_string(),
            }),
        }
    }
}

/// Trim the credential and drop anything outside printable ASCII.
///
/// Keys pasted from terminals or password managers sometimes carry stray
/// control characters, which reqwest rejects as invalid header values.
pub fn sanitize_api_key(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| (' '..='~').contains(c))
        .collect()
}
