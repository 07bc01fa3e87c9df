//! Chat command handler.

use anyhow::{Context, Result};
use parley_core::config;

pub async fn run(config: &config::Config, api_url: &str) -> Result<()> {
    parley_tui::run_interactive_chat(config, api_url)
        .await
        .context("interactive chat failed")
}
