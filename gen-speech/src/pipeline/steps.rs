//! The side-effecting operations a conversion is made of.

use crate::audio;
use crate::error::{ConversionError, ErrorKind, Result};
use crate::source::SourceDocument;
use crate::text::{self, TextChunk, TokenBudget};
use async_trait::async_trait;
use speech_client::SpeechSynthesizer;
use std::path::{Path, PathBuf};

/// Operations invoked by the runner, one per [`Operation`](super::conversion::Operation).
#[async_trait]
pub trait Steps: Send + Sync {
    /// Resolve the input path, read it, and split it into chunks.
    async fn read_chunks(&self, input: &str) -> Result<(SourceDocument, Vec<TextChunk>)>;

    /// Create an empty scratch file owned by this run.
    async fn create_scratch(&self) -> Result<PathBuf>;

    /// Turn one chunk of text into audio bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// Append audio to the scratch file, returning its new length.
    async fn append(&self, scratch: &Path, audio: &[u8]) -> Result<u64>;

    /// Move the scratch file beside the source, returning the final path.
    async fn publish(&self, scratch: &Path, source: &SourceDocument) -> Result<PathBuf>;
}

/// Steps backed by the local filesystem and a speech backend.
pub struct LocalSteps {
    synthesizer: Box<dyn SpeechSynthesizer>,
    budget: TokenBudget,
    scratch_dir: PathBuf,
}

impl LocalSteps {
    pub fn new(
        synthesizer: Box<dyn SpeechSynthesizer>,
        budget: TokenBudget,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            synthesizer,
            budget,
            scratch_dir: scratch_dir.into(),
        }
    }
}

/// Run filesystem work on the blocking pool so it never stalls the runtime.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ConversionError::with_source(ErrorKind::File, "Task join error", e))?
}

#[async_trait]
impl Steps for LocalSteps {
    async fn read_chunks(&self, input: &str) -> Result<(SourceDocument, Vec<TextChunk>)> {
        let input = input.to_string();
        let budget = self.budget;
        run_blocking(move || {
            let source = SourceDocument::resolve(&input)?;
            let content = source.read()?;
            let chunks = text::split_into_chunks(&content, &budget);
            Ok((source, chunks))
        })
        .await
    }

    async fn create_scratch(&self) -> Result<PathBuf> {
        let scratch_dir = self.scratch_dir.clone();
        run_blocking(move || audio::create_scratch(&scratch_dir)).await
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        Ok(self.synthesizer.synthesize(text).await?)
    }

    async fn append(&self, scratch: &Path, audio: &[u8]) -> Result<u64> {
        // Clone data for the blocking task
        let scratch = scratch.to_path_buf();
        let bytes = audio.to_vec();
        run_blocking(move || audio::append_audio(&scratch, &bytes)).await
    }

    async fn publish(&self, scratch: &Path, source: &SourceDocument) -> Result<PathBuf> {
        let scratch = scratch.to_path_buf();
        let source = source.path().to_path_buf();
        run_blocking(move || audio::publish(&scratch, &source)).await
    }
}
