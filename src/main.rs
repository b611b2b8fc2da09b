//! Telegram productivity assistant: notes, tasks, model-backed search and
//! summaries, and voice-note meeting summaries.
//!
//! Service handles (store pool, generative-text client) are built once here
//! and shared by every command task. A failed startup probe of the generative
//! service is only a warning: the bot runs degraded and the affected commands
//! fall back per handler.

mod bot;
mod config;
mod llm;
mod prompts;
mod store;
mod transcribe;

use anyhow::Context as _;
use std::sync::Arc;
use teloxide::Bot;
use tracing_subscriber::EnvFilter;

use crate::bot::Services;
use crate::config::Config;
use crate::llm::LlmClient;
use crate::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, "configuration error");
            std::process::exit(1);
        }
    };

    let store = Store::connect(&config.database_url)
        .await
        .context("failed to open the store")?;

    let llm = LlmClient::new(config.ollama_url.clone(), config.ollama_model.clone());
    if !llm.probe().await {
        tracing::warn!("generative service unreachable; model-backed commands will degrade");
    }

    let bot = Bot::new(config.telegram_token.clone());
    let services = Arc::new(Services { store, llm, config });

    tracing::info!("starting bot");
    bot::run(bot, services).await;

    Ok(())
}
