//! Conversion failure taxonomy.

use speech_client::SpeechError;
use std::fmt;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// What went wrong, independent of the underlying cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Path missing, wrong extension, not a regular file, unresolvable
    MalformedInput,
    /// Home-directory expansion failed
    HomeDir,
    /// File exists but cannot be read
    MissingContent,
    /// Any local filesystem operation failed
    File,
    /// Request construction, transport, or non-success status
    Request,
    /// Wrong content type, unreadable body, or empty body
    Response,
    /// A step exceeded its time limit
    Timeout,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedInput => "MALFORMED_INPUT",
            Self::HomeDir => "HOME_DIR_ERROR",
            Self::MissingContent => "MISSING_CONTENT",
            Self::File => "FILE_ERROR",
            Self::Request => "REQUEST_ERROR",
            Self::Response => "RESPONSE_ERROR",
            Self::Timeout => "TIMEOUT",
        }
    }

    /// Input problems won't fix themselves on a second attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::MalformedInput | Self::HomeDir | Self::MissingContent
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A failed conversion step: kind, message, and the underlying cause if any.
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct ConversionError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ConversionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedInput, message)
    }

    pub fn file(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::with_source(ErrorKind::File, message, source)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Prefix the message with where in the run this happened.
    pub fn context(mut self, context: impl fmt::Display) -> Self {
        self.message = format!("{}: {}", context, self.message);
        self
    }
}

impl From<SpeechError> for ConversionError {
    fn from(err: SpeechError) -> Self {
        let kind = if err.is_response_error() {
            ErrorKind::Response
        } else {
            ErrorKind::Request
        };
        let message = match &err {
            SpeechError::BuildRequest(_) => "Failed to create request",
            SpeechError::Transport(_) => "Failed to execute request",
            SpeechError::Status { .. } => "Received unexpected status code",
            SpeechError::ContentType { .. } => "Received unexpected content type",
            SpeechError::ReadBody(_) => "Failed to read response body",
            SpeechError::EmptyBody => "Received empty response body",
            SpeechError::MissingApiKey { .. } | SpeechError::ConfigError(_) => {
                "Speech client is not configured"
            }
        };
        Self::with_source(kind, message, err)
    }
}

pub type Result<T> = std::result::Result<T, ConversionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_codes() {
        assert_eq!(ErrorKind::MalformedInput.code(), "MALFORMED_INPUT");
        assert_eq!(ErrorKind::HomeDir.code(), "HOME_DIR_ERROR");
        assert_eq!(ErrorKind::MissingContent.code(), "MISSING_CONTENT");
        assert_eq!(ErrorKind::File.code(), "FILE_ERROR");
        assert_eq!(ErrorKind::Request.code(), "REQUEST_ERROR");
        assert_eq!(ErrorKind::Response.code(), "RESPONSE_ERROR");
    }

    #[test]
    fn test_retryable() {
        assert!(!ErrorKind::MalformedInput.is_retryable());
        assert!(!ErrorKind::HomeDir.is_retryable());
        assert!(!ErrorKind::MissingContent.is_retryable());
        assert!(ErrorKind::Request.is_retryable());
        assert!(ErrorKind::File.is_retryable());
        assert!(ErrorKind::Timeout.is_retryable());
    }

    #[test]
    fn test_display_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConversionError::file("Unable to open file for appending", io);
        assert_eq!(err.to_string(), "[FILE_ERROR] Unable to open file for appending");
        assert_eq!(err.source().unwrap().to_string(), "denied");

        let err = err.context("chunk 2");
        assert_eq!(
            err.to_string(),
            "[FILE_ERROR] chunk 2: Unable to open file for appending"
        );
    }

    #[test]
    fn test_from_speech_error() {
        let err: ConversionError = SpeechError::Status {
            status_code: 500,
            message: String::new(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Request);
        assert!(err.source().unwrap().to_string().contains("500"));

        let err: ConversionError = SpeechError::EmptyBody.into();
        assert_eq!(err.kind(), ErrorKind::Response);

        let err: ConversionError = SpeechError::ContentType {
            expected: "audio/mpeg".to_string(),
            actual: Some("text/html".to_string()),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Response);
    }
}
