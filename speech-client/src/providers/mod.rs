//! Speech provider implementations

pub mod mock;
mod openai;

pub use mock::MockSynthesizer;
pub use openai::OpenAiSpeech;

use crate::config::SpeechConfig;
use crate::error::Result;
use crate::provider::SpeechSynthesizer;

/// Create the default provider from configuration
pub fn get_synthesizer(config: &SpeechConfig) -> Result<Box<dyn SpeechSynthesizer>> {
    Ok(Box::new(OpenAiSpeech::from_config(config)?))
}
