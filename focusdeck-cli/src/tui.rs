use std::io;
use std::time::Duration;

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event as CEvent, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::debug;

use focusdeck_core::keys::Key;

use crate::app::App;
use crate::ui::{self, Hitboxes};

// --- Terminal setup/teardown ---
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}

pub async fn run(app: &mut App) -> io::Result<()> {
    let mut terminal = setup_terminal()?;
    let result = tui_loop(&mut terminal, app).await;
    restore_terminal(terminal)?;
    result
}

async fn tui_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> io::Result<()> {
    let mut hitboxes = Hitboxes::default();

    loop {
        app.drain_renders();
        terminal.draw(|f| ui::draw(f, app, &mut hitboxes))?;

        if app.should_quit() {
            return Ok(());
        }

        if !event::poll(Duration::from_millis(50))? {
            // let render workers make progress between polls
            tokio::task::yield_now().await;
            continue;
        }

        match event::read()? {
            CEvent::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                if is_interrupt(&key_event) {
                    return Ok(());
                }
                if let Some(key) = to_key(&key_event) {
                    app.status().clear();
                    let outcome = app.handle_key(key);
                    debug!(%key, ?outcome, "key handled");
                }
            }
            CEvent::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Left) => {
                if let Some((panel, line)) = hitboxes.resolve(mouse.column, mouse.row) {
                    app.status().clear();
                    app.click(&panel, line);
                }
            }
            _ => {}
        }
    }
}

fn is_interrupt(event: &KeyEvent) -> bool {
    event.modifiers.contains(KeyModifiers::CONTROL) && event.code == KeyCode::Char('c')
}

/// Converts a terminal key event into the config key vocabulary.
pub fn to_key(event: &KeyEvent) -> Option<Key> {
    let key = match event.code {
        KeyCode::Char(c) if event.modifiers.contains(KeyModifiers::CONTROL) => {
            Key::Ctrl(c.to_ascii_lowercase())
        }
        KeyCode::Char(' ') => Key::Space,
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Esc,
        KeyCode::Tab => Key::Tab,
        KeyCode::BackTab => Key::BackTab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_conversion() {
        let press = |code, modifiers| KeyEvent::new(code, modifiers);
        assert_eq!(to_key(&press(KeyCode::Char('j'), KeyModifiers::NONE)), Some(Key::Char('j')));
        assert_eq!(to_key(&press(KeyCode::Char('R'), KeyModifiers::SHIFT)), Some(Key::Char('R')));
        assert_eq!(to_key(&press(KeyCode::Char(' '), KeyModifiers::NONE)), Some(Key::Space));
        assert_eq!(to_key(&press(KeyCode::Char('R'), KeyModifiers::CONTROL)), Some(Key::Ctrl('r')));
        assert_eq!(to_key(&press(KeyCode::F(5), KeyModifiers::NONE)), None);
        assert!(is_interrupt(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }
}
