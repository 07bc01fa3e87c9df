//! Full-screen TUI for Parley.

pub mod common;
pub mod effects;
pub mod events;
pub mod render;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod update;

use std::io::{IsTerminal, stdout};
use std::sync::Arc;

use anyhow::Result;
use parley_core::api::HttpBackend;
use parley_core::client::ChatClient;
use parley_core::config::Config;
pub use runtime::TuiRuntime;

/// Runs the interactive chat UI against `api_url`.
pub async fn run_interactive_chat(config: &Config, api_url: &str) -> Result<()> {
    if !stdout().is_terminal() {
        anyhow::bail!(
            "Interactive mode requires a terminal.\n\
             Use `parley send '...'` for non-interactive use."
        );
    }

    let backend = HttpBackend::new(api_url, config.request_timeout())?;
    tracing::info!(%api_url, "starting interactive chat");

    let mut runtime = TuiRuntime::new(ChatClient::new(Arc::new(backend)), api_url)?;
    runtime.run()
}
