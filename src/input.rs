//! Key bindings: normal and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AimLeft,
    AimRight,
    Shoot,
    Swap,
    Pause,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, space) and vim (hjkl, etc.).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod && modifiers != KeyModifiers::CONTROL {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc if no_mod => Action::Quit,
        KeyCode::Char('p') if no_mod => Action::Pause,
        KeyCode::Left | KeyCode::Char('h') if no_mod => Action::AimLeft,
        KeyCode::Right | KeyCode::Char('l') if no_mod => Action::AimRight,
        KeyCode::Up | KeyCode::Char('k') if no_mod => Action::Shoot,
        KeyCode::Enter | KeyCode::Char(' ') if no_mod => Action::Shoot,
        KeyCode::Down | KeyCode::Char('j') if no_mod => Action::Swap,
        KeyCode::Tab | KeyCode::Char('f') if no_mod => Action::Swap,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::empty())
    }

    #[test]
    fn arrows_and_vim_keys_agree() {
        assert_eq!(key_to_action(press(KeyCode::Left)), Action::AimLeft);
        assert_eq!(key_to_action(press(KeyCode::Char('h'))), Action::AimLeft);
        assert_eq!(key_to_action(press(KeyCode::Char(' '))), Action::Shoot);
        assert_eq!(key_to_action(press(KeyCode::Char('f'))), Action::Swap);
    }
}
