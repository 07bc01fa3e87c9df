//! Pure view/render functions for the TUI.
//!
//! Functions here take `&AppState`, draw to a ratatui `Frame`, and never
//! mutate state or return effects.

use chrono::Utc;
use parley_core::conversation::Status;
use parley_core::session::{Message, Role};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::common::{truncate_with_ellipsis, wrap_text};
use crate::state::{AppState, Focus};

pub const EMPTY_CONVERSATION_TEXT: &str = "How can I help you today?";
pub const EMPTY_CONVERSATION_HINT: &str = "Start a conversation by typing a message below.";
pub const INPUT_PLACEHOLDER: &str = "Message ChatBot...";

const SIDEBAR_WIDTH: u16 = 34;
const HEADER_HEIGHT: u16 = 1;
const STATUS_HEIGHT: u16 = 1;
/// Visible draft lines before the input box stops growing.
const INPUT_MAX_LINES: u16 = 5;
/// Horizontal padding on each side of the transcript.
const TRANSCRIPT_MARGIN: u16 = 1;
/// Each sidebar entry takes a title row and a timestamp row.
const SIDEBAR_ENTRY_HEIGHT: u16 = 2;

const SPINNER_FRAMES: &[&str] = &["◐", "◓", "◑", "◒"];
const SPINNER_SPEED_DIVISOR: usize = 3;

/// Transcript height for a terminal of `height` rows with a one-line draft.
pub fn transcript_viewport_height(height: u16) -> usize {
    height.saturating_sub(HEADER_HEIGHT + STATUS_HEIGHT + 3) as usize
}

/// Renders the entire TUI to the frame.
pub fn render(app: &AppState, frame: &mut Frame) {
    let area = frame.area();

    let main_area = if app.sidebar_visible() && area.width > SIDEBAR_WIDTH * 2 {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(1)])
            .split(area);
        render_sidebar(app, frame, columns[0]);
        columns[1]
    } else {
        area
    };

    let input_height = input_line_count(app).min(INPUT_MAX_LINES) + 2;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Min(1),
            Constraint::Length(input_height),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(main_area);

    render_header(app, frame, rows[0]);
    render_transcript(app, frame, rows[1]);
    render_input(app, frame, rows[2]);
    render_status_line(app, frame, rows[3]);
}

fn spinner(app: &AppState) -> &'static str {
    SPINNER_FRAMES[(app.spinner_frame / SPINNER_SPEED_DIVISOR) % SPINNER_FRAMES.len()]
}

fn render_sidebar(app: &AppState, frame: &mut Frame, area: Rect) {
    let directory = app.client.directory();
    let focused = app.focus == Focus::Sidebar;
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::RIGHT)
        .border_style(border_style)
        .title(" Chats ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let new_chat = Paragraph::new(Line::from(vec![
        Span::styled("+ New chat", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled("  Ctrl+N", Style::default().fg(Color::DarkGray)),
    ]));
    frame.render_widget(new_chat, rows[0]);

    let width = rows[1].width.saturating_sub(2) as usize;
    let lines: Vec<Line<'static>> = if let Some(placeholder) = directory.placeholder() {
        vec![Line::styled(
            placeholder,
            Style::default().fg(Color::DarkGray),
        )]
    } else {
        let capacity = (rows[1].height / SIDEBAR_ENTRY_HEIGHT).max(1) as usize;
        let start = app.sidebar_index.saturating_sub(capacity - 1);
        let active = app.client.conversation().session_id();
        let now = Utc::now();

        directory
            .sessions()
            .iter()
            .enumerate()
            .skip(start)
            .take(capacity)
            .flat_map(|(index, session)| {
                let is_active = active == Some(session.id.as_str());
                let is_highlighted = focused && index == app.sidebar_index;
                let marker = if is_active { "▌ " } else { "  " };
                let mut title_style = Style::default();
                if is_active {
                    title_style = title_style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
                }
                if is_highlighted {
                    title_style = title_style.add_modifier(Modifier::REVERSED);
                }
                if directory.is_deleting(&session.id) {
                    title_style = title_style.add_modifier(Modifier::DIM);
                }
                [
                    Line::from(vec![
                        Span::styled(marker, Style::default().fg(Color::Cyan)),
                        Span::styled(
                            truncate_with_ellipsis(&session.display_title(), width),
                            title_style,
                        ),
                    ]),
                    Line::styled(
                        format!("  {}", session.display_timestamp(now)),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]
            })
            .collect()
    };
    frame.render_widget(Paragraph::new(lines), rows[1]);

    let footer = Paragraph::new(Line::styled(
        directory.footer(),
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(footer, rows[2]);
}

fn render_header(app: &AppState, frame: &mut Frame, area: Rect) {
    let title = app.client.conversation().display_title();
    let width = area.width.saturating_sub(TRANSCRIPT_MARGIN * 2) as usize;
    let header = Paragraph::new(Line::styled(
        truncate_with_ellipsis(title, width),
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center);
    frame.render_widget(header, area);
}

/// Builds transcript lines wrapped to `width` columns.
pub fn transcript_lines(app: &AppState, width: usize) -> Vec<Line<'static>> {
    let conversation = app.client.conversation();
    let mut lines = Vec::new();

    for message in conversation.messages() {
        push_message_lines(&mut lines, message, width);
    }

    match conversation.status() {
        Status::Sending => lines.push(Line::styled(
            format!("{} Thinking...", spinner(app)),
            Style::default().fg(Color::Yellow),
        )),
        Status::Loading => lines.push(Line::styled(
            format!("{} Loading conversation...", spinner(app)),
            Style::default().fg(Color::Yellow),
        )),
        Status::Idle | Status::Error => {}
    }

    lines
}

fn push_message_lines(lines: &mut Vec<Line<'static>>, message: &Message, width: usize) {
    let label_style = match (message.role, message.failed) {
        (_, true) => Style::default().fg(Color::Red),
        (Role::User, false) => Style::default().fg(Color::Cyan),
        (Role::Assistant, false) => Style::default().fg(Color::Green),
    }
    .add_modifier(Modifier::BOLD);
    let body_style = if message.failed {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };

    lines.push(Line::styled(format!("{}:", message.role.label()), label_style));
    for line in wrap_text(&message.content, width.saturating_sub(2)) {
        lines.push(Line::styled(format!("  {line}"), body_style));
    }
    lines.push(Line::default());
}

fn render_transcript(app: &AppState, frame: &mut Frame, area: Rect) {
    let inner = Rect {
        x: area.x + TRANSCRIPT_MARGIN.min(area.width),
        width: area.width.saturating_sub(TRANSCRIPT_MARGIN * 2),
        ..area
    };
    let conversation = app.client.conversation();
    let height = inner.height as usize;

    if conversation.messages().is_empty() && conversation.status() != Status::Loading {
        let top_padding = height.saturating_sub(2) / 2;
        let mut lines = vec![Line::default(); top_padding];
        lines.push(Line::styled(
            EMPTY_CONVERSATION_TEXT,
            Style::default().add_modifier(Modifier::BOLD),
        ));
        lines.push(Line::styled(
            EMPTY_CONVERSATION_HINT,
            Style::default().fg(Color::DarkGray),
        ));
        frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
        return;
    }

    let lines = transcript_lines(app, inner.width as usize);
    let total = lines.len();
    let max_scroll = total.saturating_sub(height);
    let scroll = app.scroll_from_bottom.min(max_scroll);
    let end = total - scroll;
    let start = end.saturating_sub(height);

    let visible: Vec<Line<'static>> = lines.into_iter().skip(start).take(end - start).collect();
    frame.render_widget(Paragraph::new(visible), inner);
}

fn input_line_count(app: &AppState) -> u16 {
    app.client.conversation().draft().split('\n').count() as u16
}

fn render_input(app: &AppState, frame: &mut Frame, area: Rect) {
    let focused = app.focus == Focus::Input;
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default().borders(Borders::ALL).border_style(border_style);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let draft = app.client.conversation().draft();
    if draft.is_empty() {
        frame.render_widget(
            Paragraph::new(Line::styled(
                INPUT_PLACEHOLDER,
                Style::default().fg(Color::DarkGray),
            )),
            inner,
        );
        if focused {
            frame.set_cursor_position((inner.x, inner.y));
        }
        return;
    }

    let draft_lines: Vec<&str> = draft.split('\n').collect();
    let visible = inner.height.max(1) as usize;
    let start = draft_lines.len().saturating_sub(visible);
    let shown: Vec<Line<'static>> = draft_lines[start..]
        .iter()
        .map(|line| Line::raw((*line).to_string()))
        .collect();
    let last_width = draft_lines.last().map_or(0, |line| line.width()) as u16;
    let last_row = (shown.len() as u16).saturating_sub(1);
    frame.render_widget(Paragraph::new(shown), inner);

    if focused {
        let x = inner.x + last_width.min(inner.width.saturating_sub(1));
        frame.set_cursor_position((x, inner.y + last_row));
    }
}

fn render_status_line(app: &AppState, frame: &mut Frame, area: Rect) {
    let conversation = app.client.conversation();
    let hint = Style::default().fg(Color::DarkGray);

    let mut spans: Vec<Span> = match conversation.status() {
        Status::Sending => vec![
            Span::styled(spinner(app), Style::default().fg(Color::Yellow)),
            Span::raw(" "),
            Span::styled("Waiting for reply...", Style::default().fg(Color::Yellow)),
            Span::raw("  "),
            Span::styled("Esc", hint),
            Span::raw(" to cancel"),
        ],
        Status::Loading => vec![
            Span::styled(spinner(app), Style::default().fg(Color::Yellow)),
            Span::raw(" "),
            Span::styled("Loading conversation...", Style::default().fg(Color::Yellow)),
        ],
        Status::Error => vec![Span::styled(
            conversation.last_error().unwrap_or("Error").to_string(),
            Style::default().fg(Color::Red),
        )],
        Status::Idle => vec![
            Span::styled("Enter", hint),
            Span::raw(" send  "),
            Span::styled("Tab", hint),
            Span::raw(" chats  "),
            Span::styled("Ctrl+B", hint),
            Span::raw(" sidebar  "),
            Span::styled("Ctrl+C", hint),
            Span::raw(" quit"),
        ],
    };
    spans.push(Span::styled(format!("  {}", app.api_url), hint));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
