//! Mock speech provider for testing
//!
//! Returns scripted audio payloads in call order and can simulate failures on
//! chosen calls, so pipelines can be exercised without a network.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Result, SpeechError};
use crate::provider::SpeechSynthesizer;

/// A mock provider with scripted responses
pub struct MockSynthesizer {
    /// Payloads returned on successive successful calls (cycled)
    payloads: Vec<Vec<u8>>,
    /// 1-based call numbers that fail, with the error to return
    failures: Mutex<HashMap<usize, SpeechError>>,
    /// Fail every call at or after this 1-based call number
    fail_from: Option<(usize, SpeechError)>,
    /// Current call count
    call_count: AtomicUsize,
    /// Texts received, in order
    received: Mutex<Vec<String>>,
}

impl MockSynthesizer {
    /// Create a provider that returns `payloads` one per call, cycling when exhausted
    pub fn with_payloads<I, P>(payloads: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Vec<u8>>,
    {
        Self {
            payloads: payloads.into_iter().map(Into::into).collect(),
            failures: Mutex::new(HashMap::new()),
            fail_from: None,
            call_count: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that echoes each chunk's text back as its audio
    pub fn echo() -> Self {
        Self::with_payloads(Vec::<Vec<u8>>::new())
    }

    /// Fail the given 1-based call with `error`; later calls proceed normally
    pub fn fail_on_call(self, call: usize, error: SpeechError) -> Self {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(call, error);
        self
    }

    /// Fail every call from the given 1-based call number onwards
    pub fn fail_from_call(mut self, call: usize, error: SpeechError) -> Self {
        self.fail_from = Some((call, error));
        self
    }

    /// Get the number of times synthesize() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Texts passed to synthesize(), in call order
    pub fn received(&self) -> Vec<String> {
        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());

        if let Some(error) = self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&call)
        {
            return Err(error);
        }

        if let Some((from, error)) = &self.fail_from {
            if call >= *from {
                return Err(clone_error(error));
            }
        }

        if self.payloads.is_empty() {
            return Ok(text.as_bytes().to_vec());
        }
        Ok(self.payloads[(call - 1) % self.payloads.len()].clone())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Clone a SpeechError (needed because reqwest errors don't implement Clone)
fn clone_error(err: &SpeechError) -> SpeechError {
    match err {
        SpeechError::MissingApiKey { env_var } => SpeechError::MissingApiKey {
            env_var: env_var.clone(),
        },
        SpeechError::Status {
            status_code,
            message,
        } => SpeechError::Status {
            status_code: *status_code,
            message: message.clone(),
        },
        SpeechError::ContentType { expected, actual } => SpeechError::ContentType {
            expected: expected.clone(),
            actual: actual.clone(),
        },
        SpeechError::EmptyBody => SpeechError::EmptyBody,
        SpeechError::ConfigError(s) => SpeechError::ConfigError(s.clone()),
        // reqwest errors can't be rebuilt; a server error keeps the request classification
        SpeechError::BuildRequest(_) | SpeechError::Transport(_) => SpeechError::Status {
            status_code: 500,
            message: "transport error (mock)".to_string(),
        },
        SpeechError::ReadBody(_) => SpeechError::EmptyBody,
    }
}
