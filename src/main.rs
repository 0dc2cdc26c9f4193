use std::io;
use std::path::PathBuf;

use clap::Parser;
use crossterm::cursor::SetCursorStyle;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;

mod agents;
mod api;
mod app;
mod config;
mod events;
mod sse;
mod text_layout;
mod theme;
mod ui;

use agents::CoachAgent;
use api::{ChatRequest, CompletionAdapter, StreamEvent};
use app::App;
use config::ChatConfig;
use events::AppEvent;
use theme::Theme;

const MAX_STREAM_EVENTS_PER_LOOP: usize = 128;

#[derive(Debug, Parser)]
#[command(
    name = "coach-chat",
    version,
    about = "Chat with preset sport coach personas over a streaming completion API"
)]
struct Cli {
    /// Path to the config file.
    #[arg(long, value_name = "PATH", default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Path to the theme file.
    #[arg(long, value_name = "PATH", default_value = "theme.toml")]
    theme: PathBuf,

    /// Coach persona to start with (football, tennis, boxing, basketball, formula-1).
    #[arg(long, value_name = "NAME")]
    agent: Option<String>,

    /// Override the configured completion model.
    #[arg(long, value_name = "MODEL")]
    model: Option<String>,
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let mut chat_config = ChatConfig::load_or_default(&cli.config);
    if let Some(model) = cli.model {
        chat_config.api.model = model;
    }
    let start_agent = match cli.agent {
        Some(name) => CoachAgent::from_name(&name).ok_or_else(|| {
            let known = CoachAgent::ALL
                .iter()
                .map(|agent| agent.label())
                .collect::<Vec<_>>()
                .join(", ");
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unknown agent '{name}' (expected one of: {known})"),
            )
        })?,
        None => CoachAgent::Football,
    };

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        SetCursorStyle::SteadyBar
    )?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    let theme = Theme::load_or_default(&cli.theme);
    let result = run_app(
        &mut terminal,
        App::with_agent(start_agent),
        &theme,
        chat_config,
    );

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        SetCursorStyle::DefaultUserShape,
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    theme: &Theme,
    chat_config: ChatConfig,
) -> io::Result<()> {
    let mut adapter = CompletionAdapter::new(chat_config.api.clone());

    while app.running {
        let mut chat_updated = false;
        for event in adapter.drain_events_limited(MAX_STREAM_EVENTS_PER_LOOP) {
            match event {
                StreamEvent::Delta { target, text } => {
                    if app.apply_delta(target, &text) {
                        chat_updated = true;
                    }
                }
                StreamEvent::Completed { target } => {
                    app.finish_stream(target);
                }
                StreamEvent::Interrupted { target } => {
                    if app.mark_interrupted(target) {
                        chat_updated = true;
                    }
                }
                StreamEvent::Failed { target, message } => {
                    if app.mark_failed(target, &message) {
                        chat_updated = true;
                    }
                }
            }
        }
        if chat_updated {
            stick_chat_to_bottom(terminal, &mut app, theme)?;
        }

        terminal.draw(|frame| ui::render(frame, &app, theme))?;

        match events::next_event()? {
            AppEvent::Tick => app.on_tick(),
            AppEvent::Quit => app.quit(),
            AppEvent::NextAgent => {
                if !app.is_edit_picker_open() {
                    app.next_agent();
                    stick_chat_to_bottom(terminal, &mut app, theme)?;
                }
            }
            AppEvent::PrevAgent => {
                if !app.is_edit_picker_open() {
                    app.prev_agent();
                    stick_chat_to_bottom(terminal, &mut app, theme)?;
                }
            }
            AppEvent::InputChar(c) => {
                if !app.is_edit_picker_open() {
                    app.input_char(c);
                }
            }
            AppEvent::Backspace => {
                if !app.is_edit_picker_open() {
                    app.backspace_input();
                }
            }
            AppEvent::CursorLeft => {
                if !app.is_edit_picker_open() {
                    app.move_cursor_left();
                }
            }
            AppEvent::CursorRight => {
                if !app.is_edit_picker_open() {
                    app.move_cursor_right();
                }
            }
            AppEvent::Submit => {
                if app.is_edit_picker_open() {
                    app.confirm_edit_pick();
                } else if let Some(text) = app.submit() {
                    start_exchange(&mut app, &mut adapter, text);
                    stick_chat_to_bottom(terminal, &mut app, theme)?;
                }
            }
            AppEvent::Cancel => {
                if app.is_edit_picker_open() {
                    app.close_edit_picker();
                } else if app.is_editing() {
                    app.cancel_edit();
                } else if app.is_streaming() {
                    adapter.cancel_active();
                    if app.stop_streaming() {
                        stick_chat_to_bottom(terminal, &mut app, theme)?;
                    }
                } else {
                    app.clear_input();
                }
            }
            AppEvent::OpenEditPicker => app.open_edit_picker(),
            AppEvent::MoveUp => {
                if app.is_edit_picker_open() {
                    app.edit_picker_move_up();
                } else {
                    app.scroll_chat_up();
                }
            }
            AppEvent::MoveDown => {
                if app.is_edit_picker_open() {
                    app.edit_picker_move_down();
                } else {
                    scroll_chat_down(terminal, &mut app, theme)?;
                }
            }
            AppEvent::ScrollChatUp | AppEvent::MouseScrollUp => app.scroll_chat_up(),
            AppEvent::ScrollChatDown | AppEvent::MouseScrollDown => {
                scroll_chat_down(terminal, &mut app, theme)?;
            }
        }
    }

    Ok(())
}

/// Starts a streaming exchange for the active agent. The adapter cancels any
/// request still in flight; its late events carry a stale target and are
/// dropped by the reducer.
fn start_exchange(app: &mut App, adapter: &mut CompletionAdapter, text: String) {
    let agent = app.active_agent();
    let target = app.begin_exchange(text);
    let messages = app.outbound_messages(agent);
    adapter.send_chat(ChatRequest {
        target,
        system_prompt: agent.system_prompt(),
        messages,
    });
}

fn stick_chat_to_bottom(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    theme: &Theme,
) -> io::Result<()> {
    let size = terminal.size()?;
    let screen = Rect::new(0, 0, size.width, size.height);
    let max_scroll = ui::chat_max_scroll(screen, app, theme);
    app.set_chat_scroll(max_scroll);
    Ok(())
}

fn scroll_chat_down(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    theme: &Theme,
) -> io::Result<()> {
    let size = terminal.size()?;
    let screen = Rect::new(0, 0, size.width, size.height);
    let max_scroll = ui::chat_max_scroll(screen, app, theme);
    app.scroll_chat_down(max_scroll);
    Ok(())
}
