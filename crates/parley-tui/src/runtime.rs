//! TUI runtime - owns the terminal, runs the event loop, executes effects.
//!
//! The reducer stays pure and produces effects; this module turns them into
//! `ChatClient` commands. Background completions land in the client's inbox,
//! which is drained once per loop iteration.

use std::io::Stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use parley_core::client::ChatClient;
use parley_core::interrupt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::AppState;
use crate::{render, terminal, update};

/// Tick cadence while a request is outstanding (spinner animation).
pub const FRAME_DURATION: Duration = Duration::from_millis(50);

/// Tick cadence when nothing is happening.
pub const IDLE_POLL_DURATION: Duration = Duration::from_millis(250);

/// Full-screen TUI runtime.
///
/// Terminal state is restored on drop, panic, or a second Ctrl+C.
pub struct TuiRuntime {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    pub state: AppState,
    last_tick: Instant,
}

impl TuiRuntime {
    /// Creates the runtime and enters the alternate screen.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn new(client: ChatClient, api_url: impl Into<String>) -> Result<Self> {
        terminal::install_panic_hook();
        interrupt::set_restore_hook(|| {
            let _ = terminal::restore_terminal();
        });
        interrupt::reset();

        let terminal = terminal::setup_terminal().context("Failed to setup terminal")?;

        Ok(Self {
            terminal,
            state: AppState::new(client, api_url),
            last_tick: Instant::now(),
        })
    }

    /// Runs the main event loop until the user quits.
    pub fn run(&mut self) -> Result<()> {
        terminal::enable_input_features()?;
        self.state.client.refresh_sessions();

        let result = self.event_loop();

        let _ = terminal::disable_input_features();
        result
    }

    fn event_loop(&mut self) -> Result<()> {
        let mut dirty = true;

        while !self.state.should_quit {
            // Raw mode delivers Ctrl+C as a key event; the signal path only
            // fires when something outside the TUI sends SIGINT.
            if interrupt::is_interrupted() {
                interrupt::reset();
                if !self.state.client.cancel() {
                    self.state.should_quit = true;
                    break;
                }
            }

            let mut events = self.collect_events()?;

            let size = self.terminal.size()?;
            events.insert(
                0,
                UiEvent::Frame {
                    width: size.width,
                    height: size.height,
                },
            );

            for event in events {
                if !matches!(&event, UiEvent::Frame { .. }) {
                    dirty = true;
                }
                let effects = update::update(&mut self.state, event);
                self.execute_effects(effects);
            }

            if dirty {
                self.terminal.draw(|frame| {
                    render::render(&self.state, frame);
                })?;
                dirty = false;
            }
        }

        Ok(())
    }

    /// Collects events from the client inbox and the terminal.
    fn collect_events(&mut self) -> Result<Vec<UiEvent>> {
        let mut events = Vec::new();

        if self.state.client.pump() {
            events.push(UiEvent::ClientUpdated);
        }

        let tick_interval = if self.state.client.is_idle() {
            IDLE_POLL_DURATION
        } else {
            FRAME_DURATION
        };
        let poll_duration = if events.is_empty() {
            tick_interval.saturating_sub(self.last_tick.elapsed())
        } else {
            Duration::ZERO
        };

        if event::poll(poll_duration)? {
            events.push(UiEvent::Terminal(event::read()?));
            while event::poll(Duration::ZERO)? {
                events.push(UiEvent::Terminal(event::read()?));
            }
        }

        if self.last_tick.elapsed() >= tick_interval {
            events.push(UiEvent::Tick);
            self.last_tick = Instant::now();
        }

        Ok(events)
    }

    fn execute_effects(&mut self, effects: Vec<UiEffect>) {
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: UiEffect) {
        tracing::debug!(?effect, "executing effect");
        let client = &mut self.state.client;
        match effect {
            UiEffect::Quit => self.state.should_quit = true,
            UiEffect::SubmitDraft => {
                client.submit();
            }
            UiEffect::CancelSend => {
                client.cancel();
            }
            UiEffect::NewChat => client.new_chat(),
            UiEffect::SelectSession { session_id } => client.select_session(session_id),
            UiEffect::DeleteSession { session_id } => client.delete_session(session_id),
            UiEffect::RefreshSessions => client.refresh_sessions(),
        }
    }
}

impl Drop for TuiRuntime {
    fn drop(&mut self) {
        let _ = terminal::restore_terminal();
    }
}
