//! In-process execution harness for [`Conversion`].
//!
//! Drives the state machine to completion, wrapping each operation in its
//! per-step timeout and retry policy, and keeps the session journal current so
//! an interrupted run can pick up where it stopped.

use super::conversion::{Completion, Conversion, Operation};
use super::steps::Steps;
use crate::audio::rewind_scratch;
use crate::error::{ConversionError, ErrorKind, Result};
use crate::session::{Session, SessionLock, SessionStore};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

/// Operation categories that carry their own policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Read,
    Scratch,
    Synthesize,
    Append,
    Publish,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "read",
            Self::Scratch => "scratch",
            Self::Synthesize => "synthesize",
            Self::Append => "append",
            Self::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// Timeout and retry behavior for one kind of step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPolicy {
    /// Time limit for a single attempt
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry, doubled for each one after
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    1
}

fn default_backoff_ms() -> u64 {
    1000
}

impl Default for StepPolicy {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl StepPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

fn default_synthesize_policy() -> StepPolicy {
    StepPolicy {
        max_attempts: 3,
        ..StepPolicy::default()
    }
}

/// Per-operation policies, as configured under `[steps]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPolicies {
    #[serde(default)]
    pub read: StepPolicy,
    #[serde(default)]
    pub scratch: StepPolicy,
    #[serde(default = "default_synthesize_policy")]
    pub synthesize: StepPolicy,
    #[serde(default)]
    pub append: StepPolicy,
    #[serde(default)]
    pub publish: StepPolicy,
}

impl Default for StepPolicies {
    fn default() -> Self {
        Self {
            read: StepPolicy::default(),
            scratch: StepPolicy::default(),
            synthesize: default_synthesize_policy(),
            append: StepPolicy::default(),
            publish: StepPolicy::default(),
        }
    }
}

impl StepPolicies {
    pub fn get(&self, kind: StepKind) -> &StepPolicy {
        match kind {
            StepKind::Read => &self.read,
            StepKind::Scratch => &self.scratch,
            StepKind::Synthesize => &self.synthesize,
            StepKind::Append => &self.append,
            StepKind::Publish => &self.publish,
        }
    }
}

/// Runs conversions against a set of [`Steps`].
pub struct Runner<S> {
    steps: S,
    policies: StepPolicies,
    sessions: Option<SessionStore>,
    resume: bool,
}

impl<S: Steps> Runner<S> {
    pub fn new(steps: S, policies: StepPolicies) -> Self {
        Self {
            steps,
            policies,
            sessions: None,
            resume: true,
        }
    }

    /// Journal progress in `store` and resume matching unfinished runs from it.
    pub fn with_sessions(mut self, store: SessionStore) -> Self {
        self.sessions = Some(store);
        self
    }

    /// Whether an unfinished journal may be picked up. Journaling continues either way.
    pub fn resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// Drive `conversion` until it is published or fails.
    pub async fn run(&self, conversion: &mut Conversion) -> Result<PathBuf> {
        let mut journal: Option<Session> = None;
        // Held until the run ends so no other run can resume this journal
        let mut claim: Option<SessionLock> = None;
        // Scratch length after the last fully appended chunk
        let mut committed_len = 0u64;

        loop {
            let result = match conversion.pending() {
                None => break,
                Some(Operation::ReadSource { input }) => self
                    .attempt(StepKind::Read, || self.steps.read_chunks(input))
                    .await
                    .map(|(source, chunks)| Completion::Chunked { source, chunks }),
                Some(Operation::CreateScratch) => self
                    .attempt(StepKind::Scratch, || self.steps.create_scratch())
                    .await
                    .map(Completion::ScratchCreated),
                Some(Operation::Synthesize { chunk, total }) => {
                    debug!(
                        "Synthesizing part {} of {} ({} bytes)",
                        chunk.index,
                        total,
                        chunk.text.len()
                    );
                    self.attempt(StepKind::Synthesize, || self.steps.synthesize(&chunk.text))
                        .await
                        .map(Completion::Synthesized)
                }
                Some(Operation::Append {
                    chunk,
                    scratch,
                    audio,
                }) => {
                    let steps = &self.steps;
                    let appended = self
                        .attempt(StepKind::Append, || async move {
                            rewind_scratch(scratch, committed_len)?;
                            steps.append(scratch, audio).await
                        })
                        .await;
                    match appended {
                        Ok(len) => {
                            committed_len = len;
                            if let (Some(store), Some(session)) = (&self.sessions, &mut journal) {
                                session.mark_chunk_complete(chunk.index, len);
                                store.save(session).map(|_| Completion::Appended)
                            } else {
                                Ok(Completion::Appended)
                            }
                        }
                        Err(e) => Err(e),
                    }
                }
                Some(Operation::Publish { scratch, source }) => self
                    .attempt(StepKind::Publish, || self.steps.publish(scratch, source))
                    .await
                    .map(Completion::Published),
            };

            let completion = match result {
                Ok(completion) => completion,
                Err(e) => return Err(conversion.fail(e)),
            };

            let just_chunked = matches!(completion, Completion::Chunked { .. });
            let created = match &completion {
                Completion::ScratchCreated(path) => Some(path.clone()),
                _ => None,
            };
            let published = matches!(completion, Completion::Published(_));

            conversion.complete(completion);

            if just_chunked {
                match self.find_resumable(conversion) {
                    Ok(Some((session, lock))) => {
                        committed_len = session.committed_len;
                        conversion.resume(session.scratch_path.clone(), session.completed_chunks);
                        journal = Some(session);
                        claim = Some(lock);
                    }
                    Ok(None) => {}
                    Err(e) => return Err(conversion.fail(e)),
                }
            } else if let Some(scratch) = created {
                if let Some(store) = &self.sessions {
                    let source = conversion.source().map(|s| s.path().to_path_buf());
                    let total = conversion.chunks().len();
                    match source.map(|s| store.create(&s, &scratch, total)) {
                        Some(Ok((session, lock))) => {
                            journal = Some(session);
                            claim = Some(lock);
                        }
                        Some(Err(e)) => return Err(conversion.fail(e)),
                        None => {}
                    }
                }
            } else if published {
                // The scratch file is gone, so the journal can't be resumed once released
                drop(claim.take());
                if let (Some(store), Some(session)) = (&self.sessions, &journal) {
                    if let Err(e) = store.remove(session) {
                        // The output is already in place; a stale journal is harmless
                        warn!("Could not remove session {}: {}", session.session_id, e);
                    }
                }
            }
        }

        conversion.finish().ok_or_else(|| {
            ConversionError::new(ErrorKind::File, "Conversion stopped before publishing")
        })
    }

    fn find_resumable(&self, conversion: &Conversion) -> Result<Option<(Session, SessionLock)>> {
        let (Some(store), Some(source)) = (&self.sessions, conversion.source()) else {
            return Ok(None);
        };
        if !self.resume {
            return Ok(None);
        }

        let found = store.find_resumable(source.path(), conversion.chunks().len())?;
        if let Some((s, _)) = &found {
            let (completed, total, pct) = s.progress();
            info!(
                "Resuming session: {}/{} chunks ({:.1}% complete)",
                completed, total, pct
            );
            if s.is_complete() {
                info!("All chunks already processed, publishing");
            }
        }
        Ok(found)
    }

    /// Run one step under its policy: each attempt is time-limited, and
    /// retryable failures are repeated with exponential backoff.
    async fn attempt<T, F, Fut>(&self, kind: StepKind, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let policy = self.policies.get(kind);
        let max_attempts = policy.max_attempts.max(1);
        let mut delay = policy.backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let outcome = match tokio::time::timeout(policy.timeout(), op()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ConversionError::new(
                    ErrorKind::Timeout,
                    format!("{} step timed out after {:?}", kind, policy.timeout()),
                )),
            };

            match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} step succeeded on attempt {}", kind, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if attempt < max_attempts && e.kind().is_retryable() => {
                    warn!(
                        "{} step failed (attempt {}/{}): {}",
                        kind, attempt, max_attempts, e
                    );
                    warn!("Retrying in {:?}...", delay);
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
