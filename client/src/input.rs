//! Keyboard mapping from terminal key events to session commands

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use shared::{Command, Direction};

/// Translates one key event into a command. Releases and repeats are
/// ignored so a held key does not flood the server.
pub fn map_key(event: KeyEvent) -> Option<Command> {
    if event.kind != KeyEventKind::Press {
        return None;
    }

    if event.modifiers.contains(KeyModifiers::CONTROL) {
        return match event.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(Command::Quit),
            _ => None,
        };
    }

    match event.code {
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'w' => Some(Command::MoveCursor(Direction::Up)),
            's' => Some(Command::MoveCursor(Direction::Down)),
            'a' => Some(Command::MoveCursor(Direction::Left)),
            'd' => Some(Command::MoveCursor(Direction::Right)),
            ' ' => Some(Command::PlaceStone),
            'r' => Some(Command::Reset),
            'q' => Some(Command::Quit),
            _ => None,
        },
        KeyCode::Up => Some(Command::MoveCursor(Direction::Up)),
        KeyCode::Down => Some(Command::MoveCursor(Direction::Down)),
        KeyCode::Left => Some(Command::MoveCursor(Direction::Left)),
        KeyCode::Right => Some(Command::MoveCursor(Direction::Right)),
        KeyCode::Enter => Some(Command::PlaceStone),
        KeyCode::Tab => Some(Command::Pass),
        KeyCode::Esc => Some(Command::Quit),
        _ => None,
    }
}

/// One-line key reference shown under the board
pub fn help_line() -> &'static str {
    "WASD/arrows: move  Space/Enter: place  Tab: pass  R: reset (practice)  Q: quit"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_movement_keys() {
        assert_eq!(
            map_key(press(KeyCode::Char('w'))),
            Some(Command::MoveCursor(Direction::Up))
        );
        assert_eq!(
            map_key(press(KeyCode::Char('A'))),
            Some(Command::MoveCursor(Direction::Left))
        );
        assert_eq!(
            map_key(press(KeyCode::Down)),
            Some(Command::MoveCursor(Direction::Down))
        );
        assert_eq!(
            map_key(press(KeyCode::Right)),
            Some(Command::MoveCursor(Direction::Right))
        );
    }

    #[test]
    fn test_action_keys() {
        assert_eq!(map_key(press(KeyCode::Char(' '))), Some(Command::PlaceStone));
        assert_eq!(map_key(press(KeyCode::Enter)), Some(Command::PlaceStone));
        assert_eq!(map_key(press(KeyCode::Tab)), Some(Command::Pass));
        assert_eq!(map_key(press(KeyCode::Char('r'))), Some(Command::Reset));
        assert_eq!(map_key(press(KeyCode::Char('q'))), Some(Command::Quit));
        assert_eq!(map_key(press(KeyCode::Esc)), Some(Command::Quit));
    }

    #[test]
    fn test_ctrl_c_quits() {
        let event = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(event), Some(Command::Quit));

        // Ctrl+W is not a cursor move
        let event = KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL);
        assert_eq!(map_key(event), None);
    }

    #[test]
    fn test_release_ignored() {
        let event = KeyEvent {
            code: KeyCode::Char('w'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(map_key(event), None);
    }

    #[test]
    fn test_unmapped_keys() {
        assert_eq!(map_key(press(KeyCode::Char('x'))), None);
        assert_eq!(map_key(press(KeyCode::F(1))), None);
    }
}
