//! gen-speech - Convert plain-text files to spoken MP3 audio

mod audio;
mod config;
mod error;
mod pipeline;
mod session;
mod source;
mod text;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::GenSpeechConfig;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use pipeline::{Conversion, LocalSteps, Runner};
use session::SessionStore;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "gen-speech")]
#[command(about = "Convert a .txt file to an MP3 narration beside it", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the text file (a leading ~ is expanded)
    text_file: Option<String>,

    /// Start fresh, ignore an unfinished earlier run
    #[arg(long)]
    no_resume: bool,

    /// Voice to use (overrides config)
    #[arg(long)]
    voice: Option<String>,

    /// Speech model to use (overrides config)
    #[arg(long)]
    model: Option<String>,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set default voice
    SetVoice {
        /// Voice name (e.g. nova, alloy, onyx)
        voice: String,
    },
    /// Set default speech model
    SetModel {
        /// Model identifier (e.g. tts-1, tts-1-hd)
        model: String,
    },
    /// Store an API key in the config file
    SetApiKey {
        /// The bearer token
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    if let Some(Commands::Config { action }) = &args.command {
        return handle_config_command(action);
    }

    let input = args.text_file.clone().ok_or_else(|| {
        anyhow::anyhow!("Text file path is required. Run 'gen-speech --help' for usage.")
    })?;

    let mut config = GenSpeechConfig::load().context("Failed to load configuration")?;
    if let Some(voice) = &args.voice {
        config.speech.voice = voice.clone();
    }
    if let Some(model) = &args.model {
        config.speech.model = model.clone();
    }

    debug!("Input: {}", input);
    debug!("Model: {}, voice: {}", config.speech.model, config.speech.voice);
    debug!("Chunk budget: {:?}", config.chunking);

    let synthesizer =
        speech_client::get_synthesizer(&config.speech).context("Failed to set up speech client")?;
    let steps = LocalSteps::new(synthesizer, config.chunking, config.scratch_path()?);
    let runner = Runner::new(steps, config.steps.clone())
        .with_sessions(SessionStore::new(config.sessions_path()?))
        .resume(!args.no_resume);

    let mut conversion = Conversion::new(input);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));

    let mut progress = conversion.progress();
    pb.set_message(progress.current());
    let watcher = {
        let pb = pb.clone();
        tokio::spawn(async move {
            while let Some(status) = progress.changed().await {
                pb.set_message(status);
            }
        })
    };

    let result = runner.run(&mut conversion).await;
    drop(conversion);
    // The watcher ends once the conversion is dropped
    if let Err(e) = watcher.await {
        debug!("Progress watcher stopped abnormally: {}", e);
    }

    pb.finish_and_clear();
    let output = result?;
    eprintln!("Saved to {}", output.display());
    println!("{}", output.display());
    Ok(())
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = GenSpeechConfig::load()?;
            println!("Configuration file: {:?}", GenSpeechConfig::config_path()?);
            println!();
            println!("endpoint = \"{}\"", config.speech.endpoint);
            println!("model = \"{}\"", config.speech.model);
            println!("voice = \"{}\"", config.speech.voice);
            println!("request_timeout_secs = {}", config.speech.request_timeout_secs);
            match config.speech.resolve_api_key() {
                Ok(_) if config.speech.api_key.is_some() => println!("api_key = (set in config)"),
                Ok(_) => println!("api_key = (from environment)"),
                Err(_) => println!("api_key = (none)"),
            }
            println!("max_tokens = {}", config.chunking.max_tokens);
            println!("tokens_per_word = {}", config.chunking.tokens_per_word);
            println!("data_dir = \"{}\"", config.data_dir()?.display());
            println!(
                "synthesize: timeout {}s, {} attempt(s)",
                config.steps.synthesize.timeout_secs, config.steps.synthesize.max_attempts
            );
        }
        ConfigAction::SetVoice { voice } => {
            let mut config = GenSpeechConfig::load()?;
            config.speech.voice = voice.clone();
            config.save()?;
            println!("Default voice set to: {}", voice);
        }
        ConfigAction::SetModel { model } => {
            let mut config = GenSpeechConfig::load()?;
            config.speech.model = model.clone();
            config.save()?;
            println!("Default model set to: {}", model);
        }
        ConfigAction::SetApiKey { key } => {
            let mut config = GenSpeechConfig::load()?;
            let key = speech_client::config::sanitize_api_key(key);
            if key.is_empty() {
                anyhow::bail!("API key is empty");
            }
            config.speech.api_key = Some(key);
            config.save()?;
            println!("API key saved to {:?}", GenSpeechConfig::config_path()?);
        }
    }
    Ok(())
}
