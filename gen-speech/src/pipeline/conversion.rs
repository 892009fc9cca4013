//! The conversion state machine.
//!
//! `Conversion` decides what happens next and records what happened; it never
//! touches the filesystem or the network. A harness asks for the
//! [`pending`](Conversion::pending) operation, performs it however it likes
//! (retries, timeouts, persistence), and reports back with
//! [`complete`](Conversion::complete) or [`fail`](Conversion::fail).
//!
//! ```text
//! Start -> Chunked -> Synthesizing(1..=N) -> Publishing -> Published -> Done
//!    \________\____________\___________________\-> Failed
//! ```
//!
//! Creating the scratch file moves `Chunked` straight to `Synthesizing(1)`, or
//! to `Publishing` when the text had no words. A resumed run enters at the
//! first chunk not yet appended.

use super::progress::{ProgressHandle, ProgressReporter};
use crate::error::{ConversionError, ErrorKind};
use crate::source::SourceDocument;
use crate::text::TextChunk;
use log::info;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a conversion is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Chunked,
    /// Working on the given 1-based chunk
    Synthesizing(usize),
    /// Every chunk is appended; the scratch file is ready to move
    Publishing,
    Published,
    Done,
    Failed(ErrorKind),
}

/// The next unit of work the harness should perform.
#[derive(Debug)]
pub enum Operation<'a> {
    /// Resolve and read the input, then chunk it
    ReadSource { input: &'a str },
    /// Create the empty scratch file
    CreateScratch,
    /// Synthesize one chunk
    Synthesize { chunk: &'a TextChunk, total: usize },
    /// Append the chunk's synthesized audio to the scratch file
    Append {
        chunk: &'a TextChunk,
        scratch: &'a Path,
        audio: &'a [u8],
    },
    /// Move the scratch file into place beside the source
    Publish {
        scratch: &'a Path,
        source: &'a SourceDocument,
    },
}

/// The result of a successfully performed [`Operation`].
pub enum Completion {
    Chunked {
        source: SourceDocument,
        chunks: Vec<TextChunk>,
    },
    ScratchCreated(PathBuf),
    Synthesized(Vec<u8>),
    Appended,
    Published(PathBuf),
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chunked { chunks, .. } => write!(f, "Chunked({} chunks)", chunks.len()),
            Self::ScratchCreated(p) => write!(f, "ScratchCreated({})", p.display()),
            Self::Synthesized(audio) => write!(f, "Synthesized({} bytes)", audio.len()),
            Self::Appended => f.write_str("Appended"),
            Self::Published(p) => write!(f, "Published({})", p.display()),
        }
    }
}

/// One text-to-audio conversion run.
pub struct Conversion {
    input: String,
    phase: Phase,
    source: Option<SourceDocument>,
    chunks: Vec<TextChunk>,
    scratch: Option<PathBuf>,
    /// Chunks whose audio is fully in the scratch file
    completed: usize,
    /// Audio for chunk `completed + 1`, synthesized but not yet appended
    audio: Option<Vec<u8>>,
    output: Option<PathBuf>,
    progress: ProgressReporter,
}

impl Conversion {
    /// Start a conversion of the file at `input` (may begin with `~`).
    pub fn new(input: impl Into<String>) -> Self {
        let (progress, _) = ProgressReporter::new();
        Self {
            input: input.into(),
            phase: Phase::Start,
            source: None,
            chunks: Vec::new(),
            scratch: None,
            completed: 0,
            audio: None,
            output: None,
            progress,
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// A read-only view of the status string.
    pub fn progress(&self) -> ProgressHandle {
        self.progress.subscribe()
    }

    pub fn source(&self) -> Option<&SourceDocument> {
        self.source.as_ref()
    }

    pub fn chunks(&self) -> &[TextChunk] {
        &self.chunks
    }

    /// Number of chunks fully appended so far.
    #[cfg(test)]
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// The operation to perform next, or `None` once nothing is left to do.
    pub fn pending(&self) -> Option<Operation<'_>> {
        match self.phase {
            Phase::Start => Some(Operation::ReadSource { input: &self.input }),
            Phase::Chunked => Some(Operation::CreateScratch),
            Phase::Synthesizing(_) | Phase::Publishing => {
                let scratch = self.scratch.as_deref()?;
                match self.chunks.get(self.completed) {
                    Some(chunk) => match &self.audio {
                        None => Some(Operation::Synthesize {
                            chunk,
                            total: self.chunks.len(),
                        }),
                        Some(audio) => Some(Operation::Append {
                            chunk,
                            scratch,
                            audio: audio.as_slice(),
                        }),
                    },
                    None => Some(Operation::Publish {
                        scratch,
                        source: self.source.as_ref()?,
                    }),
                }
            }
            Phase::Published | Phase::Done | Phase::Failed(_) => None,
        }
    }

    /// Record the outcome of the pending operation.
    ///
    /// # Panics
    /// If `completion` doesn't answer the operation `pending()` returned.
    pub fn complete(&mut self, completion: Completion) {
        match (self.phase, completion) {
            (Phase::Start, Completion::Chunked { source, chunks }) => {
                info!("File content has {} chunk(s) to process.", chunks.len());
                self.progress
                    .set(format!("Text split into {} part(s)", chunks.len()));
                self.source = Some(source);
                self.chunks = chunks;
                self.phase = Phase::Chunked;
            }
            (Phase::Chunked, Completion::ScratchCreated(path)) => {
                info!("Created temporary file for processing: {}", path.display());
                self.scratch = Some(path);
                self.enter_next_chunk();
            }
            (Phase::Synthesizing(_), Completion::Synthesized(audio)) if self.audio.is_none() => {
                self.audio = Some(audio);
            }
            (Phase::Synthesizing(_), Completion::Appended) if self.audio.is_some() => {
                self.audio = None;
                self.completed += 1;
                self.enter_next_chunk();
            }
            (Phase::Publishing, Completion::Published(path)) => {
                info!("Output file: {}", path.display());
                self.scratch = None;
                self.output = Some(path);
                self.phase = Phase::Published;
            }
            (phase, completion) => {
                unreachable!("{completion:?} does not follow {phase:?}")
            }
        }
    }

    /// Continue a previous run whose scratch file already holds `completed` chunks.
    ///
    /// Only valid straight after chunking; replaces scratch creation.
    pub fn resume(&mut self, scratch: PathBuf, completed: usize) {
        debug_assert_eq!(self.phase, Phase::Chunked);
        info!(
            "Resuming {} at part {} of {}",
            scratch.display(),
            completed + 1,
            self.chunks.len()
        );
        self.scratch = Some(scratch);
        self.completed = completed.min(self.chunks.len());
        self.enter_next_chunk();
    }

    /// Mark the run failed, returning the error annotated with where it happened.
    pub fn fail(&mut self, err: ConversionError) -> ConversionError {
        let err = match self.phase {
            Phase::Start => err.context("failed to read file"),
            Phase::Chunked => err.context("failed to create temporary file"),
            Phase::Synthesizing(i) => err.context(format!("failed to process chunk {}", i)),
            Phase::Publishing => err.context("failed to move output file"),
            Phase::Published | Phase::Done | Phase::Failed(_) => err,
        };
        self.phase = Phase::Failed(err.kind());
        self.progress.set(format!("Failed: {}", err));
        err
    }

    /// Move a published conversion to `Done`, returning the final path.
    pub fn finish(&mut self) -> Option<PathBuf> {
        if self.phase != Phase::Published {
            return None;
        }
        let output = self.output.clone()?;
        self.phase = Phase::Done;
        self.progress.set(format!("Saved to {}", output.display()));
        Some(output)
    }

    fn enter_next_chunk(&mut self) {
        let total = self.chunks.len();
        if self.completed < total {
            let index = self.completed + 1;
            info!("Processing part {} of {}", index, total);
            self.progress
                .set(format!("Processing part {} of {}", index, total));
            self.phase = Phase::Synthesizing(index);
        } else {
            // Everything is appended; only publishing remains
            self.progress.set("Publishing output");
            self.phase = Phase::Publishing;
        }
    }
}
