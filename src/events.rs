use std::io;
use std::time::Duration;

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Tick,
    Quit,
    NextAgent,
    PrevAgent,
    InputChar(char),
    Backspace,
    CursorLeft,
    CursorRight,
    Submit,
    /// Esc: stop a stream, close the picker, or cancel an edit.
    Cancel,
    OpenEditPicker,
    MoveUp,
    MoveDown,
    ScrollChatUp,
    ScrollChatDown,
    MouseScrollUp,
    MouseScrollDown,
}

fn map_key_event(key_event: KeyEvent) -> AppEvent {
    if key_event.kind != KeyEventKind::Press {
        return AppEvent::Tick;
    }

    if key_event.code == KeyCode::Char('c') && key_event.modifiers.contains(KeyModifiers::CONTROL) {
        return AppEvent::Quit;
    }
    if key_event.code == KeyCode::Char('e') && key_event.modifiers.contains(KeyModifiers::CONTROL) {
        return AppEvent::OpenEditPicker;
    }

    match key_event.code {
        KeyCode::Tab => AppEvent::NextAgent,
        KeyCode::BackTab => AppEvent::PrevAgent,
        KeyCode::Up
            if key_event.modifiers.contains(KeyModifiers::SHIFT)
                || key_event.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            AppEvent::ScrollChatUp
        }
        KeyCode::Down
            if key_event.modifiers.contains(KeyModifiers::SHIFT)
                || key_event.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            AppEvent::ScrollChatDown
        }
        KeyCode::PageUp => AppEvent::ScrollChatUp,
        KeyCode::PageDown => AppEvent::ScrollChatDown,
        KeyCode::Up => AppEvent::MoveUp,
        KeyCode::Down => AppEvent::MoveDown,
        KeyCode::Left => AppEvent::CursorLeft,
        KeyCode::Right => AppEvent::CursorRight,
        KeyCode::Backspace => AppEvent::Backspace,
        KeyCode::Enter => AppEvent::Submit,
        KeyCode::Esc => AppEvent::Cancel,
        KeyCode::Char(c) => AppEvent::InputChar(c),
        _ => AppEvent::Tick,
    }
}

fn map_mouse_event_kind(kind: MouseEventKind) -> AppEvent {
    match kind {
        MouseEventKind::ScrollUp => AppEvent::MouseScrollUp,
        MouseEventKind::ScrollDown => AppEvent::MouseScrollDown,
        _ => AppEvent::Tick,
    }
}

pub fn next_event() -> io::Result<AppEvent> {
    if event::poll(Duration::from_millis(16))? {
        match event::read()? {
            Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                return Ok(map_key_event(key_event));
            }
            Event::Mouse(mouse_event) => {
                return Ok(map_mouse_event_kind(mouse_event.kind));
            }
            _ => {}
        }
    }

    Ok(AppEvent::Tick)
}
