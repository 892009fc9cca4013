use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// Audio encoding requested from the TTS service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
}

impl AudioFormat {
    /// Media type the service answers with for this format
    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
        }
    }

    /// File extension, including the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => ".mp3",
        }
    }
}

/// Body of a single synthesis call
#[derive(Debug, Clone, Serialize)]
pub struct SpeechRequest<'a> {
    pub model: &'a str,
    pub input: &'a str,
    pub voice: &'a str,
    pub response_format: AudioFormat,
}

/// Trait for text-to-speech backends
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize one chunk of text, returning the raw audio bytes
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// Get the backend name for display
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = SpeechRequest {
            model: "tts-1",
            input: "Hello \"world\"",
            voice: "nova",
            response_format: AudioFormat::Mp3,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "tts-1");
        assert_eq!(json["input"], "Hello \"world\"");
        assert_eq!(json["voice"], "nova");
        assert_eq!(json["response_format"], "mp3");
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!(AudioFormat::Mp3.media_type(), "audio/mpeg");
        assert_eq!(AudioFormat::Mp3.extension(), ".mp3");
    }
}
