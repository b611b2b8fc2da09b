//! Environment-driven configuration.
//!
//! Everything is read once at startup. The bot token is the only required
//! value; the rest default to a local development setup.

use anyhow::Context as _;
use std::env;

/// Process configuration, loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot API token. Required.
    pub telegram_token: String,
    /// Store connection string.
    pub database_url: String,
    /// Base URL of the generative-text service.
    pub ollama_url: String,
    /// Model identifier sent with every generation request.
    pub ollama_model: String,
    /// whisper.cpp CLI binary used for voice transcription.
    pub whisper_bin: String,
    /// Path to the whisper.cpp model file.
    pub whisper_model: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let telegram_token =
            env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN is not set")?;

        Ok(Self {
            telegram_token,
            database_url: env_or("DATABASE_URL", "sqlite://notekeeper.db"),
            ollama_url: env_or("OLLAMA_URL", "http://ollama:11434"),
            ollama_model: env_or("OLLAMA_MODEL", "deepseek-r1:1.5b"),
            whisper_bin: env_or("WHISPER_BIN", "whisper-cli"),
            whisper_model: env_or("WHISPER_MODEL", "models/ggml-base.en.bin"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
