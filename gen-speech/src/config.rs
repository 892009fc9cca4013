//! gen-speech configuration management.

use crate::pipeline::StepPolicies;
use crate::text::TokenBudget;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use speech_client::SpeechConfig;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenSpeechConfig {
    /// Speech endpoint, model, voice, and credentials
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Chunk size limits
    #[serde(default)]
    pub chunking: TokenBudget,

    /// Where scratch files and journals live. None means the local data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,

    /// Per-operation timeouts and retries
    #[serde(default)]
    pub steps: StepPolicies,
}

impl GenSpeechConfig {
    /// Get the config file path: ~/.config/cli-programs/gen-speech.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home
            .join(".config")
            .join("cli-programs")
            .join("gen-speech.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: GenSpeechConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Base directory for run state.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.scratch_dir {
            return Ok(dir.clone());
        }
        dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .map(|d| d.join("gen-speech"))
            .context("Could not determine data directory")
    }

    /// Directory for in-progress audio files.
    pub fn scratch_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("scratch"))
    }

    /// Directory for resumption journals.
    pub fn sessions_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("sessions"))
    }
}
