/// Keyboard input.
///
/// Drains pending terminal events once per frame and turns key presses into
/// `UiAction`s. Only Press (and Repeat, for panel navigation) count; Release
/// events are reported by some terminals and are dropped here.
///
///   Space        →  Start
///   F1 / Tab     →  Toggle settings
///   Esc          →  Close settings
///   Arrows       →  Settings panel (only while it is open)
///   q / Ctrl+C   →  Quit

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::warn;

/// A user action before it is routed to the controller or the panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiAction {
    Start,
    ToggleSettings,
    CloseSettings,
    PanelUp,
    PanelDown,
    PanelLeft,
    PanelRight,
    Quit,
}

pub struct InputState {
    actions: Vec<UiAction>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            actions: Vec::with_capacity(8),
        }
    }

    /// Drain all pending terminal events without blocking.
    pub fn drain_events(&mut self, panel_open: bool) -> &[UiAction] {
        self.actions.clear();

        loop {
            match poll(Duration::ZERO) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    warn!(error = %e, "terminal poll failed");
                    break;
                }
            }
            match event::read() {
                Ok(Event::Key(key)) => {
                    if let Some(action) = action_for(&key, panel_open) {
                        self.actions.push(action);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "terminal read failed");
                    break;
                }
            }
        }

        &self.actions
    }
}

/// Map one key event. `panel_open` enables the panel keys.
pub fn action_for(key: &KeyEvent, panel_open: bool) -> Option<UiAction> {
    let repeat_ok = matches!(
        key.code,
        KeyCode::Up | KeyCode::Down | KeyCode::Left | KeyCode::Right
    );
    match key.kind {
        KeyEventKind::Press => {}
        KeyEventKind::Repeat if repeat_ok => {}
        _ => return None,
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(UiAction::Quit),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char(' ') => Some(UiAction::Start),
        KeyCode::F(1) | KeyCode::Tab => Some(UiAction::ToggleSettings),
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(UiAction::Quit),
        KeyCode::Esc if panel_open => Some(UiAction::CloseSettings),
        KeyCode::Up if panel_open => Some(UiAction::PanelUp),
        KeyCode::Down if panel_open => Some(UiAction::PanelDown),
        KeyCode::Left if panel_open => Some(UiAction::PanelLeft),
        KeyCode::Right if panel_open => Some(UiAction::PanelRight),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyEventState;

    use super::*;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        key(code, KeyEventKind::Press)
    }

    #[test]
    fn space_is_the_only_start_key() {
        assert_eq!(action_for(&press(KeyCode::Char(' ')), false), Some(UiAction::Start));
        assert_eq!(action_for(&press(KeyCode::Enter), false), None);
        assert_eq!(action_for(&press(KeyCode::Char('s')), false), None);
    }

    #[test]
    fn settings_keys() {
        assert_eq!(action_for(&press(KeyCode::F(1)), false), Some(UiAction::ToggleSettings));
        assert_eq!(action_for(&press(KeyCode::Tab), true), Some(UiAction::ToggleSettings));
        assert_eq!(action_for(&press(KeyCode::Esc), true), Some(UiAction::CloseSettings));
        assert_eq!(action_for(&press(KeyCode::Esc), false), None);
    }

    #[test]
    fn arrows_only_drive_an_open_panel() {
        assert_eq!(action_for(&press(KeyCode::Up), false), None);
        assert_eq!(action_for(&press(KeyCode::Up), true), Some(UiAction::PanelUp));
        assert_eq!(
            action_for(&key(KeyCode::Right, KeyEventKind::Repeat), true),
            Some(UiAction::PanelRight)
        );
    }

    #[test]
    fn releases_and_repeated_start_are_dropped() {
        assert_eq!(action_for(&key(KeyCode::Char(' '), KeyEventKind::Release), false), None);
        assert_eq!(action_for(&key(KeyCode::Char(' '), KeyEventKind::Repeat), false), None);
    }

    #[test]
    fn quit_keys() {
        assert_eq!(action_for(&press(KeyCode::Char('q')), false), Some(UiAction::Quit));
        let ctrl_c = KeyEvent {
            modifiers: KeyModifiers::CONTROL,
            ..press(KeyCode::Char('c'))
        };
        assert_eq!(action_for(&ctrl_c, true), Some(UiAction::Quit));
    }
}
