//! Text-to-speech client library for the gen-speech workspace
//!
//! Provides a single seam, [`SpeechSynthesizer`], with:
//! - OpenAI `/v1/audio/speech` (HTTP)
//! - A scripted mock for tests

pub mod config;
pub mod error;
pub mod provider;
pub mod providers;

pub use config::SpeechConfig;
pub use error::{Result, SpeechError};
pub use provider::{AudioFormat, SpeechRequest, SpeechSynthesizer};
pub use providers::{MockSynthesizer, OpenAiSpeech, get_synthesizer};
