//! OpenAI speech provider
//!
//! Direct HTTP implementation of the `/v1/audio/speech` endpoint. One request
//! per call, no retries; callers decide whether a failure is worth repeating.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

use crate::config::SpeechConfig;
use crate::error::{Result, SpeechError};
use crate::provider::{AudioFormat, SpeechRequest, SpeechSynthesizer};

/// Provider for the OpenAI speech API
pub struct OpenAiSpeech {
    endpoint: String,
    model: String,
    voice: String,
    format: AudioFormat,
    api_key: String,
    client: Client,
}

impl OpenAiSpeech {
    /// Create a new provider with an already-resolved credential
    pub fn new(config: &SpeechConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(SpeechError::BuildRequest)?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            voice: config.voice.clone(),
            format: AudioFormat::Mp3,
            api_key,
            client,
        })
    }

    /// Create a provider, resolving the credential from config or environment
    pub fn from_config(config: &SpeechConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        Self::new(config, api_key)
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }
}

/// Media type without parameters, e.g. `audio/mpeg; charset=binary` -> `audio/mpeg`
fn essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or_default().trim()
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let body = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: self.format,
        };

        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .build()
            .map_err(SpeechError::BuildRequest)?;

        debug!("POST {} ({} chars)", self.endpoint, text.len());

        let response = self
            .client
            .execute(request)
            .await
            .map_err(SpeechError::Transport)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let message = response.text().await.unwrap_or_default();
            return Err(SpeechError::Status {
                status_code: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        let expected = self.format.media_type();
        let actual = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if actual.as_deref().map(essence) != Some(expected) {
            return Err(SpeechError::ContentType {
                expected: expected.to_string(),
                actual,
            });
        }

        let bytes = response.bytes().await.map_err(SpeechError::ReadBody)?;
        if bytes.is_empty() {
            return Err(SpeechError::EmptyBody);
        }

        Ok(bytes.to_vec())
    }

    fn name(&self) -> &'static str {
        "OpenAI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve exactly one canned HTTP response and hand back the raw request.
    async fn serve_once(response: Vec<u8>) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];

            // Read headers, then as much body as Content-Length announces
            let header_end = loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if let Some(pos) = find(&request, b"\r\n\r\n") {
                    break pos + 4;
                }
                assert!(n > 0, "connection closed before headers completed");
            };
            let headers = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while request.len() < header_end + content_length {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            socket.write_all(&response).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{}/v1/audio/speech", addr), handle)
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    fn http_response(status: &str, content_type: Option<&str>, body: &[u8]) -> Vec<u8> {
        let mut out = format!("HTTP/1.1 {}\r\n", status);
        if let Some(ct) = content_type {
            out.push_str(&format!("Content-Type: {}\r\n", ct));
        }
        out.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        ));
        let mut bytes = out.into_bytes();
        bytes.extend_from_slice(body);
        bytes
    }

    fn provider(endpoint: String) -> OpenAiSpeech {
        let config = SpeechConfig {
            endpoint,
            ..Default::default()
        };
        // Loopback servers must not be routed through a proxy from the environment
        OpenAiSpeech {
            client: Client::builder().no_proxy().build().unwrap(),
            ..OpenAiSpeech::new(&config, "test-key".to_string()).unwrap()
        }
    }

    #[tokio::test]
    async fn test_successful_synthesis() {
        let (url, server) =
            serve_once(http_response("200 OK", Some("audio/mpeg"), b"AUDIO1")).await;

        let audio = provider(url).synthesize("Hello there").await.unwrap();
        assert_eq!(audio, b"AUDIO1");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/audio/speech"));
        assert!(
            request
                .to_lowercase()
                .contains("authorization: bearer test-key")
        );
        assert!(request.contains("\"model\":\"tts-1\""));
        assert!(request.contains("\"input\":\"Hello there\""));
        assert!(request.contains("\"voice\":\"nova\""));
        assert!(request.contains("\"response_format\":\"mp3\""));
    }

    #[tokio::test]
    async fn test_content_type_parameters_ignored() {
        let (url, _server) = serve_once(http_response(
            "200 OK",
            Some("audio/mpeg; charset=binary"),
            b"AUDIO",
        ))
        .await;

        let audio = provider(url).synthesize("Hi").await.unwrap();
        assert_eq!(audio, b"AUDIO");
    }

    #[tokio::test]
    async fn test_server_error_status() {
        let (url, _server) = serve_once(http_response(
            "500 Internal Server Error",
            Some("application/json"),
            b"{\"error\":\"boom\"}",
        ))
        .await;

        let err = provider(url).synthesize("Hi").await.unwrap_err();
        assert!(matches!(err, SpeechError::Status { status_code: 500, .. }));
        assert!(err.is_request_error());
    }

    #[tokio::test]
    async fn test_non_ok_success_status_rejected() {
        let (url, _server) =
            serve_once(http_response("202 Accepted", Some("audio/mpeg"), b"AUDIO")).await;

        let err = provider(url).synthesize("Hi").await.unwrap_err();
        assert!(matches!(err, SpeechError::Status { status_code: 202, .. }));
    }

    #[tokio::test]
    async fn test_wrong_content_type() {
        let (url, _server) =
            serve_once(http_response("200 OK", Some("application/json"), b"{}")).await;

        let err = provider(url).synthesize("Hi").await.unwrap_err();
        match &err {
            SpeechError::ContentType { expected, actual } => {
                assert_eq!(expected, "audio/mpeg");
                assert_eq!(actual.as_deref(), Some("application/json"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_response_error());
    }

    #[tokio::test]
    async fn test_missing_content_type() {
        let (url, _server) = serve_once(http_response("200 OK", None, b"AUDIO")).await;

        let err = provider(url).synthesize("Hi").await.unwrap_err();
        assert!(matches!(err, SpeechError::ContentType { actual: None, .. }));
    }

    #[tokio::test]
    async fn test_empty_body() {
        let (url, _server) = serve_once(http_response("200 OK", Some("audio/mpeg"), b"")).await;

        let err = provider(url).synthesize("Hi").await.unwrap_err();
        assert!(matches!(err, SpeechError::EmptyBody));
        assert!(err.is_response_error());
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = provider(format!("http://{}/v1/audio/speech", addr))
            .synthesize("Hi")
            .await
            .unwrap_err();
        assert!(matches!(err, SpeechError::Transport(_)));
        assert!(err.is_request_error());
    }

    #[test]
    fn test_essence() {
        assert_eq!(essence("audio/mpeg"), "audio/mpeg");
        assert_eq!(essence("audio/mpeg ; q=1"), "audio/mpeg");
        assert_eq!(essence(""), "");
    }
}
