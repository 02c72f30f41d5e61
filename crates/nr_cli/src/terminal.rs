use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::{cursor, execute, terminal};
use nr_reader::Key;
use std::io;

/// Terminal input decoded into reader terms. Mouse columns are already scaled to
/// gesture units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    Key(Key),
    Press(f32),
    Drag(f32),
    Release(f32),
    Resize,
}

pub fn convert_event(event: &Event, cell_width: f32) -> Option<Input> {
    match event {
        Event::Key(key) => convert_key(key).map(Input::Key),
        Event::Mouse(mouse) => convert_mouse(mouse, cell_width),
        Event::Resize(_, _) => Some(Input::Resize),
        _ => None,
    }
}

fn convert_key(key: &KeyEvent) -> Option<Key> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c')).then_some(Key::Escape);
    }
    match key.code {
        KeyCode::Left => Some(Key::Left),
        KeyCode::Right => Some(Key::Right),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Esc => Some(Key::Escape),
        KeyCode::Char(' ') => Some(Key::Space),
        KeyCode::Char(c) => Some(Key::Char(c)),
        _ => None,
    }
}

fn convert_mouse(mouse: &MouseEvent, cell_width: f32) -> Option<Input> {
    let x = mouse.column as f32 * cell_width;
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(Input::Press(x)),
        MouseEventKind::Drag(MouseButton::Left) => Some(Input::Drag(x)),
        MouseEventKind::Up(MouseButton::Left) => Some(Input::Release(x)),
        _ => None,
    }
}

/// Raw mode, alternate screen and mouse capture for as long as the guard lives
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(
            io::stdout(),
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide
        )?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(
            io::stdout(),
            cursor::Show,
            DisableMouseCapture,
            terminal::LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();
    }
}
