//! CLI entry and dispatch.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use parley_core::api::{ChatBackend, HttpBackend};
use parley_core::config::{self, API_URL_ENV};
use parley_core::{interrupt, logging};
use tracing_appender::non_blocking::WorkerGuard;

mod commands;

#[derive(Parser)]
#[command(name = "parley")]
#[command(version)]
#[command(about = "Terminal chat client for a session-based prediction backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Backend base URL (overrides the config file)
    #[arg(long, global = true, value_name = "URL", env = API_URL_ENV)]
    api_url: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Manage stored chat sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Send one message and print the reply
    Send {
        /// Continue an existing session instead of starting a new one
        #[arg(long, value_name = "SESSION_ID")]
        session: Option<String>,

        /// Message text (read from stdin when omitted)
        #[arg(value_name = "TEXT")]
        text: Option<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum SessionCommands {
    /// Lists stored sessions
    List,
    /// Shows the transcript of a session
    Show {
        /// The ID of the session to show
        #[arg(value_name = "SESSION_ID")]
        id: String,
    },
    /// Deletes a session
    Delete {
        /// The ID of the session to delete
        #[arg(value_name = "SESSION_ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Generate a fresh config from Rust defaults (for xtask)
    Generate,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    interrupt::init()?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

/// Loaded config, logging guard and backend for commands that talk to the server.
struct Connection {
    config: config::Config,
    api_url: String,
    backend: Arc<dyn ChatBackend>,
    _log_guard: Option<WorkerGuard>,
}

fn connect(api_url_override: Option<&str>) -> Result<Connection> {
    let config = config::Config::load().context("load config")?;
    let log_guard = match logging::init(&config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {e:#}");
            None
        }
    };

    let api_url = config.effective_api_url(api_url_override)?;
    let backend = HttpBackend::new(&api_url, config.request_timeout())?;
    tracing::debug!(%api_url, "backend configured");

    Ok(Connection {
        config,
        api_url,
        backend: Arc::new(backend),
        _log_guard: log_guard,
    })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli { command, api_url } = cli;

    // default to chat mode
    let Some(command) = command else {
        let conn = connect(api_url.as_deref())?;
        return commands::chat::run(&conn.config, &conn.api_url).await;
    };

    match command {
        Commands::Sessions { command } => {
            let conn = connect(api_url.as_deref())?;
            let backend = conn.backend.as_ref();
            match command {
                SessionCommands::List => commands::sessions::list(backend).await,
                SessionCommands::Show { id } => commands::sessions::show(backend, &id).await,
                SessionCommands::Delete { id } => commands::sessions::delete(backend, &id).await,
            }
        }
        Commands::Send { session, text } => {
            let conn = connect(api_url.as_deref())?;
            commands::send::run(Arc::clone(&conn.backend), session, text).await
        }
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Generate => commands::config::generate(),
        },
    }
}
