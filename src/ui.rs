use ratatui::prelude::*;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Clear, Padding, Paragraph};

use crate::app::{App, MessageOrigin};
use crate::agents::CoachAgent;
use crate::text_layout::{wrap_plain_lines, wrap_word_with_positions};
use crate::theme::Theme;

const TEXT_PADDING: u16 = 1;
const SELECTOR_HEIGHT: u16 = 3;
const STATUS_HEIGHT: u16 = 3;
const MAX_INPUT_TEXT_LINES: u16 = 5;
const ACTIVE_TAB_BG: Color = Color::Rgb(90, 145, 200);
const ACTIVE_TAB_FG: Color = Color::Black;
const STATUS_HELP_TEXT: &str =
    "Tab/Shift+Tab switch coach | Enter send | Ctrl+E edit a message | Esc stop/cancel | Ctrl+C quit";

fn screen_areas(screen: Rect) -> (Rect, Rect, Rect) {
    let [selector, body, status] = Layout::vertical([
        Constraint::Length(SELECTOR_HEIGHT),
        Constraint::Min(0),
        Constraint::Length(STATUS_HEIGHT),
    ])
    .areas(screen);
    (selector, body, status)
}

fn body_areas(body: Rect, app: &App) -> (Rect, Rect) {
    let input_width = body.width.saturating_sub(TEXT_PADDING * 2).max(1);
    let wrapped = wrap_word_with_positions(app.chat_input(), input_width);
    let cursor_line = wrapped
        .positions
        .get(app.chat_cursor())
        .map(|(line, _)| *line)
        .unwrap_or(0);
    let max_input_height = body.height.saturating_sub(1).max(1);
    let (input_height, _) = input_box_metrics(wrapped.line_count, cursor_line, max_input_height);
    let [messages, input] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(input_height)]).areas(body);
    (messages, input)
}

pub fn input_text_width(screen: Rect) -> u16 {
    let (_selector, body, _status) = screen_areas(screen);
    body.width.saturating_sub(TEXT_PADDING * 2).max(1)
}

pub fn chat_max_scroll(screen: Rect, app: &App, theme: &Theme) -> u16 {
    let (_selector, body, _status) = screen_areas(screen);
    if body.width < 1 || body.height < 2 {
        return 0;
    }
    let (messages_area, _input_area) = body_areas(body, app);
    let text_width = messages_area.width.saturating_sub(TEXT_PADDING * 2).max(1);
    let total_lines = chat_lines(app, theme, text_width).len() as u16;
    let visible_lines = messages_area.height.saturating_sub(TEXT_PADDING * 2);
    total_lines.saturating_sub(visible_lines)
}

pub fn render(frame: &mut Frame, app: &App, theme: &Theme) {
    let (selector, body, status) = screen_areas(frame.area());
    let (messages_area, input_area) = body_areas(body, app);

    render_selector(frame, selector, app, theme);
    render_messages(frame, messages_area, app, theme);
    render_input(frame, input_area, app, theme);
    render_status(frame, status, app, theme);

    if app.is_edit_picker_open() {
        render_edit_picker(frame, app, theme);
    }
}

fn render_selector(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let mut spans = vec![Span::styled("Coach: ", Style::default().fg(theme.muted_fg))];
    for (idx, agent) in CoachAgent::ALL.iter().enumerate() {
        if idx > 0 {
            spans.push(Span::raw("  "));
        }
        let style = if *agent == app.active_agent() {
            Style::default()
                .bg(ACTIVE_TAB_BG)
                .fg(ACTIVE_TAB_FG)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.muted_fg)
        };
        spans.push(Span::styled(format!(" {} ", agent.label()), style));
    }
    let selector = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .style(Style::default().bg(theme.selector_bg))
            .padding(Padding::uniform(TEXT_PADDING)),
    );
    frame.render_widget(selector, area);
}

fn render_messages(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let text_width = area.width.saturating_sub(TEXT_PADDING * 2).max(1);
    let lines = chat_lines(app, theme, text_width);
    let messages = Paragraph::new(Text::from(lines))
        .style(Style::default().bg(theme.chat_bg).fg(theme.text_fg))
        .scroll((app.chat_scroll(), 0))
        .block(
            Block::default()
                .style(Style::default().bg(theme.chat_bg))
                .padding(Padding::uniform(TEXT_PADDING)),
        );
    frame.render_widget(messages, area);
}

fn render_input(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let text_width = area.width.saturating_sub(TEXT_PADDING * 2).max(1);
    let wrapped = wrap_word_with_positions(app.chat_input(), text_width);
    let (cursor_line, cursor_col) = wrapped
        .positions
        .get(app.chat_cursor())
        .copied()
        .unwrap_or((0, 0));
    let visible_lines = area.height.saturating_sub(TEXT_PADDING * 2).max(1);
    let scroll_offset = cursor_line.saturating_sub(visible_lines.saturating_sub(1));

    let input_fg = if app.is_editing() {
        theme.active_fg
    } else {
        theme.text_fg
    };
    let input = Paragraph::new(wrapped.rendered)
        .style(Style::default().bg(theme.input_bg).fg(input_fg))
        .scroll((scroll_offset, 0))
        .block(
            Block::default()
                .style(Style::default().bg(theme.input_bg))
                .padding(Padding::uniform(TEXT_PADDING)),
        );
    frame.render_widget(input, area);

    if !app.is_edit_picker_open() {
        let x = area.x + TEXT_PADDING + cursor_col;
        let y = area.y + TEXT_PADDING + cursor_line.saturating_sub(scroll_offset);
        frame.set_cursor_position((x.min(area.right().saturating_sub(1)), y));
    }
}

fn render_status(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let text = status_line_text(app);
    let status = Paragraph::new(text)
        .style(Style::default().bg(theme.status_bg).fg(theme.muted_fg))
        .block(
            Block::default()
                .style(Style::default().bg(theme.status_bg))
                .padding(Padding::uniform(TEXT_PADDING)),
        );
    frame.render_widget(status, area);
}

fn status_line_text(app: &App) -> String {
    if app.is_edit_picker_open() {
        return "Up/Down select a message | Enter edit | Esc close".to_string();
    }
    if app.is_editing() {
        return "Editing message | Enter resends from here | Esc cancels".to_string();
    }
    if let Some(target) = app.streaming_target() {
        let dots = typing_dots(app.ticks);
        if target.agent == app.active_agent() {
            return format!("{} coach is typing{dots} | Esc to stop", target.agent.label());
        }
        return format!(
            "{} coach is still answering{dots} | Esc to stop",
            target.agent.label()
        );
    }
    STATUS_HELP_TEXT.to_string()
}

fn typing_dots(ticks: u64) -> &'static str {
    match (ticks / 2) % 3 {
        0 => ".",
        1 => "..",
        _ => "...",
    }
}

/// Builds the full chat transcript as display lines: a bold header per
/// bubble, the wrapped body, and a blank separator between bubbles.
fn chat_lines(app: &App, theme: &Theme, width: u16) -> Vec<Line<'static>> {
    let width = width.max(1);
    let messages = app.active_messages();
    let streaming_index = app
        .streaming_target()
        .filter(|target| target.agent == app.active_agent())
        .map(|target| target.index);

    let mut lines = Vec::new();
    for (idx, message) in messages.iter().enumerate() {
        match message.origin {
            MessageOrigin::User => {
                lines.push(Line::from(Span::styled(
                    "You",
                    Style::default()
                        .fg(theme.user_fg)
                        .add_modifier(Modifier::BOLD),
                )));
                for body in wrap_plain_lines(&message.text, width) {
                    lines.push(Line::from(Span::styled(
                        body,
                        Style::default().fg(theme.text_fg),
                    )));
                }
            }
            MessageOrigin::Coach => {
                lines.push(Line::from(Span::styled(
                    format!("{} coach", app.active_agent().label()),
                    Style::default()
                        .fg(theme.coach_fg)
                        .add_modifier(Modifier::BOLD),
                )));
                if message.text.is_empty() {
                    if streaming_index == Some(idx) {
                        lines.push(Line::from(Span::styled(
                            "…",
                            Style::default().fg(theme.muted_fg),
                        )));
                    }
                } else {
                    for body in wrap_plain_lines(&message.text, width) {
                        lines.push(Line::from(Span::styled(
                            body,
                            Style::default().fg(theme.text_fg),
                        )));
                    }
                }
            }
            MessageOrigin::Notice => {
                for body in wrap_plain_lines(&message.text, width) {
                    lines.push(Line::from(Span::styled(
                        body,
                        Style::default()
                            .fg(theme.notice_fg)
                            .add_modifier(Modifier::ITALIC),
                    )));
                }
            }
        }
        if idx + 1 < messages.len() {
            lines.push(Line::default());
        }
    }
    lines
}

fn render_edit_picker(frame: &mut Frame, app: &App, theme: &Theme) {
    let entries = app.edit_picker_entries();
    if entries.is_empty() {
        return;
    }
    let selected = app.edit_picker_selected().unwrap_or(0);

    let width = frame.area().width.min(80).max(30);
    let max_rows = frame.area().height.saturating_sub(6).max(3);
    let shown_count = (entries.len() as u16).min(max_rows);
    let height = shown_count
        .saturating_add(4)
        .min(frame.area().height.max(3));
    let x = frame
        .area()
        .x
        .saturating_add(frame.area().width.saturating_sub(width) / 2);
    let y = frame
        .area()
        .y
        .saturating_add(frame.area().height.saturating_sub(height) / 2);
    let overlay = Rect::new(x, y, width, height);

    let start = selected.saturating_sub((shown_count as usize).saturating_sub(1));
    let preview_width = (width as usize).saturating_sub(6).max(8);

    let mut lines = Vec::with_capacity(shown_count as usize + 1);
    lines.push(Line::from(vec![
        Span::styled(
            "Edit a message",
            Style::default()
                .fg(theme.active_fg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            "(Up/Down select, Enter edit, Esc close)",
            Style::default().fg(theme.muted_fg),
        ),
    ]));
    for (offset, (_, text)) in entries.iter().skip(start).take(shown_count as usize).enumerate() {
        let absolute_idx = start + offset;
        let is_selected = absolute_idx == selected;
        let style = if is_selected {
            Style::default()
                .fg(theme.active_fg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text_fg)
        };
        lines.push(Line::from(vec![
            Span::styled(
                if is_selected { ">" } else { " " }.to_string(),
                Style::default().fg(theme.muted_fg),
            ),
            Span::raw(" "),
            Span::styled(message_preview(text, preview_width), style),
        ]));
    }

    frame.render_widget(Clear, overlay);
    frame.render_widget(
        Paragraph::new(Text::from(lines)).block(
            Block::default()
                .style(Style::default().bg(theme.status_bg))
                .padding(Padding::uniform(TEXT_PADDING)),
        ),
        overlay,
    );
}

fn message_preview(text: &str, max_chars: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let truncated: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{truncated}…")
}

fn input_box_metrics(input_text_lines: u16, cursor_line: u16, max_input_height: u16) -> (u16, u16) {
    let text_lines = input_text_lines.max(1).min(MAX_INPUT_TEXT_LINES);
    let height = (text_lines + TEXT_PADDING * 2).min(max_input_height.max(1));
    let visible = height.saturating_sub(TEXT_PADDING * 2).max(1);
    let scroll_offset = cursor_line.saturating_sub(visible.saturating_sub(1));
    (height, scroll_offset)
}

#[cfg(test)]
#[path = "../tests/unit/ui_tests.rs"]
mod tests;
