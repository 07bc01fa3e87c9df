//! TUI application state.
//!
//! `AppState` owns the headless `ChatClient` (directory + conversation) and
//! the view-only state around it: focus, sidebar cursor, scroll position.

use parley_core::client::ChatClient;
use parley_core::conversation::Status;
use parley_core::session::SessionSummary;

/// Which pane receives keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Input,
    Sidebar,
}

pub struct AppState {
    pub client: ChatClient,
    /// Backend URL shown in the status line.
    pub api_url: String,
    pub focus: Focus,
    /// Highlighted row in the sidebar.
    pub sidebar_index: usize,
    /// Transcript lines scrolled up from the bottom (0 = follow latest).
    pub scroll_from_bottom: usize,
    /// Transcript viewport height, updated each frame.
    pub transcript_height: usize,
    pub spinner_frame: usize,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(client: ChatClient, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            focus: Focus::default(),
            sidebar_index: 0,
            scroll_from_bottom: 0,
            transcript_height: 0,
            spinner_frame: 0,
            should_quit: false,
        }
    }

    /// Session under the sidebar cursor.
    pub fn highlighted_session(&self) -> Option<&SessionSummary> {
        self.client.directory().get(self.sidebar_index)
    }

    pub fn is_sending(&self) -> bool {
        self.client.conversation().status() == Status::Sending
    }

    pub fn sidebar_visible(&self) -> bool {
        !self.client.directory().is_collapsed()
    }

    /// Keeps the sidebar cursor inside the current list.
    pub fn clamp_sidebar_index(&mut self) {
        let len = self.client.directory().len();
        self.sidebar_index = self.sidebar_index.min(len.saturating_sub(1));
    }
}
