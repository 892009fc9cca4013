use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("API key not found. Set {env_var} environment variable or add api_key to config.")]
    MissingApiKey { env_var: String },

    #[error("Failed to create request: {0}")]
    BuildRequest(#[source] reqwest::Error),

    #[error("Failed to execute request: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Received unexpected status code: {status_code}{}", detail(message))]
    Status { status_code: u16, message: String },

    #[error("Received unexpected content type: expected {expected}, got {}", actual.as_deref().unwrap_or("none"))]
    ContentType {
        expected: String,
        actual: Option<String>,
    },

    #[error("Failed to read response body: {0}")]
    ReadBody(#[source] reqwest::Error),

    #[error("Received empty response body")]
    EmptyBody,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SpeechError {
    /// True for failures that happened before a usable response arrived:
    /// building the request, sending it, or a non-success status.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::BuildRequest(_) | Self::Transport(_) | Self::Status { .. }
        )
    }

    /// True for failures in an otherwise successful response.
    pub fn is_response_error(&self) -> bool {
        matches!(
            self,
            Self::ContentType { .. } | Self::ReadBody(_) | Self::EmptyBody
        )
    }
}

fn detail(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(" ({})", message)
    }
}

pub type Result<T> = std::result::Result<T, SpeechError>;
