//! Send command handler.
//!
//! Runs one request/response exchange through `ChatClient`, the same state
//! machine the TUI drives.

use std::io::{self, IsTerminal, Read};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use parley_core::api::ChatBackend;
use parley_core::client::ChatClient;
use parley_core::conversation::Status;
use parley_core::interrupt::{self, InterruptedError};
use parley_core::session::FAILED_REPLY_TEXT;

pub async fn run(
    backend: Arc<dyn ChatBackend>,
    session: Option<String>,
    text: Option<String>,
) -> Result<()> {
    let text = match text {
        Some(text) => text,
        None => read_stdin()?,
    };
    if text.trim().is_empty() {
        bail!("Message text is empty");
    }

    let mut client = ChatClient::new(backend);

    if let Some(session_id) = session.as_deref() {
        client.select_session(session_id);
        client.settle().await;
        if client.conversation().status() == Status::Error {
            let reason = client
                .conversation()
                .last_error()
                .unwrap_or("Could not load conversation");
            bail!("{reason}");
        }
    }

    if !client.send(&text) {
        bail!("Message was not sent");
    }

    let interrupted = tokio::select! {
        () = client.settle() => false,
        () = interrupt::wait_for_interrupt() => true,
    };
    if interrupted {
        client.cancel();
        return Err(InterruptedError.into());
    }

    let conversation = client.conversation();
    let reply = conversation
        .messages()
        .last()
        .context("no reply received")?;
    if reply.failed {
        bail!("{FAILED_REPLY_TEXT}");
    }
    println!("{}", reply.content);

    if session.is_none()
        && let Some(session_id) = conversation.session_id()
    {
        eprintln!("Session: {} ({})", session_id, conversation.display_title());
    }

    Ok(())
}

fn read_stdin() -> Result<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        bail!("No message given. Pass TEXT or pipe it via stdin.");
    }
    let mut text = String::new();
    stdin
        .lock()
        .read_to_string(&mut text)
        .context("read message from stdin")?;
    Ok(text)
}
