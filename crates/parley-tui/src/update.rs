//! TUI reducer (update function).
//!
//! All view-state mutations happen here. The runtime calls
//! `update(app, event)` and executes the returned effects. Editing the draft
//! and toggling the sidebar are local state changes and happen inline;
//! anything that talks to the backend is returned as an effect.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::render;
use crate::state::{AppState, Focus};

/// The main reducer function.
pub fn update(app: &mut AppState, event: UiEvent) -> Vec<UiEffect> {
    match event {
        UiEvent::Tick => {
            app.spinner_frame = app.spinner_frame.wrapping_add(1);
            vec![]
        }
        UiEvent::Frame { height, .. } => {
            app.transcript_height = render::transcript_viewport_height(height);
            vec![]
        }
        UiEvent::ClientUpdated => {
            app.clamp_sidebar_index();
            vec![]
        }
        UiEvent::Terminal(term_event) => handle_terminal_event(app, term_event),
    }
}

fn handle_terminal_event(app: &mut AppState, event: Event) -> Vec<UiEffect> {
    match event {
        Event::Key(key) => handle_key(app, key),
        Event::Paste(text) => {
            if app.focus == Focus::Input {
                let text = text.replace("\r\n", "\n").replace('\r', "\n");
                app.client.conversation_mut().draft_mut().push_str(&text);
            }
            vec![]
        }
        _ => vec![],
    }
}

fn handle_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    if key.kind != KeyEventKind::Press {
        return vec![];
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('c') if ctrl => return vec![UiEffect::Quit],
        KeyCode::Char('n') if ctrl => return start_new_chat(app),
        KeyCode::Char('b') if ctrl => {
            app.client.toggle_sidebar();
            if !app.sidebar_visible() {
                app.focus = Focus::Input;
            }
            return vec![];
        }
        KeyCode::Tab => {
            if app.sidebar_visible() {
                app.focus = match app.focus {
                    Focus::Input => Focus::Sidebar,
                    Focus::Sidebar => Focus::Input,
                };
            }
            return vec![];
        }
        KeyCode::PageUp => {
            app.scroll_from_bottom = app.scroll_from_bottom.saturating_add(page_size(app));
            return vec![];
        }
        KeyCode::PageDown => {
            app.scroll_from_bottom = app.scroll_from_bottom.saturating_sub(page_size(app));
            return vec![];
        }
        KeyCode::Esc => {
            if app.is_sending() {
                return vec![UiEffect::CancelSend];
            }
            app.focus = Focus::Input;
            return vec![];
        }
        _ => {}
    }

    match app.focus {
        Focus::Input => handle_input_key(app, key),
        Focus::Sidebar => handle_sidebar_key(app, key),
    }
}

fn handle_input_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    let newline = key
        .modifiers
        .intersects(KeyModifiers::ALT | KeyModifiers::SHIFT);

    match key.code {
        KeyCode::Enter if newline => {
            app.client.conversation_mut().draft_mut().push('\n');
            vec![]
        }
        KeyCode::Enter => {
            let conversation = app.client.conversation();
            if conversation.draft().trim().is_empty() || conversation.is_busy() {
                return vec![];
            }
            app.scroll_from_bottom = 0;
            vec![UiEffect::SubmitDraft]
        }
        KeyCode::Backspace => {
            app.client.conversation_mut().draft_mut().pop();
            vec![]
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.client.conversation_mut().draft_mut().push(c);
            vec![]
        }
        _ => vec![],
    }
}

fn handle_sidebar_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            app.sidebar_index = app.sidebar_index.saturating_sub(1);
            vec![]
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.sidebar_index = app.sidebar_index.saturating_add(1);
            app.clamp_sidebar_index();
            vec![]
        }
        KeyCode::Enter => {
            let Some(session) = app.highlighted_session() else {
                return vec![];
            };
            let session_id = session.id.clone();
            app.focus = Focus::Input;
            app.scroll_from_bottom = 0;
            vec![UiEffect::SelectSession { session_id }]
        }
        KeyCode::Char('d') | KeyCode::Delete => app
            .highlighted_session()
            .map(|session| {
                vec![UiEffect::DeleteSession {
                    session_id: session.id.clone(),
                }]
            })
            .unwrap_or_default(),
        KeyCode::Char('r') => vec![UiEffect::RefreshSessions],
        KeyCode::Char('n') => start_new_chat(app),
        _ => vec![],
    }
}

fn start_new_chat(app: &mut AppState) -> Vec<UiEffect> {
    app.focus = Focus::Input;
    app.scroll_from_bottom = 0;
    vec![UiEffect::NewChat]
}

fn page_size(app: &AppState) -> usize {
    app.transcript_height.saturating_sub(1).max(1)
}
