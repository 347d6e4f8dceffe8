/// Gamepad input using gilrs.
///
/// Button mapping comes from the `[gamepad]` section of config.toml.
/// Default mapping:
///   A / Start             →  Start
///   Select / Y            →  Toggle settings
///   (none)                →  Quit
///   D-pad / Left Stick    →  Settings panel navigation
///
/// Everything is edge-triggered: holding a button fires once.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};
#[cfg(feature = "gamepad")]
use tracing::{info, warn};

use super::input::UiAction;
use crate::config::GamepadConfig;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,
    R1,
    Start,
    Select,
}

const BTN_COUNT: usize = 8;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH" => Some(Btn::A),
            "B" | "EAST" => Some(Btn::B),
            "X" | "WEST" => Some(Btn::X),
            "Y" | "NORTH" => Some(Btn::Y),
            "L1" | "LB" => Some(Btn::L1),
            "R1" | "RB" => Some(Btn::R1),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East => Some(Btn::B),
            Button::West => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::LeftTrigger => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Directions for panel navigation; D-pad and stick feed the same slots.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
enum Dir {
    Up,
    Down,
    Left,
    Right,
}

struct ActionMap {
    start: Vec<Btn>,
    settings: Vec<Btn>,
    quit: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            start: vec![Btn::A, Btn::Start],
            settings: vec![Btn::Select, Btn::Y],
            quit: vec![],
        }
    }
}

impl ActionMap {
    fn from_config(cfg: &GamepadConfig) -> Self {
        fn parse_list(names: &[String], fallback: Vec<Btn>) -> Vec<Btn> {
            let parsed: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
            if parsed.is_empty() && !names.is_empty() {
                fallback
            } else {
                parsed
            }
        }
        let defaults = ActionMap::default();
        ActionMap {
            start: parse_list(&cfg.start, defaults.start),
            settings: parse_list(&cfg.settings, defaults.settings),
            quit: parse_list(&cfg.quit, defaults.quit),
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    /// Buttons pressed since the last `update`, indexed by `Btn`.
    pressed: [bool; BTN_COUNT],
    /// Directions pressed since the last `update`, indexed by `Dir`.
    dirs: [bool; 4],
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick_held: [bool; 4],
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick: (f32, f32),

    action_map: ActionMap,
    actions: Vec<UiAction>,

    pub connected: bool,
}

impl GamepadState {
    pub fn new(cfg: &GamepadConfig) -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs, connected) = match Gilrs::new() {
            Ok(g) => {
                let has_pad = g.gamepads().next().is_some();
                (Some(g), has_pad)
            }
            Err(e) => {
                warn!(error = %e, "gamepad support unavailable");
                (None, false)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs,
            pressed: [false; BTN_COUNT],
            dirs: [false; 4],
            stick_held: [false; 4],
            stick: (0.0, 0.0),
            action_map: ActionMap::from_config(cfg),
            actions: Vec::with_capacity(4),
            connected,
        }
    }

    /// Poll pending gamepad events and return the actions they produce.
    pub fn update(&mut self, panel_open: bool) -> &[UiAction] {
        self.pressed = [false; BTN_COUNT];
        self.dirs = [false; 4];

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();

        self.collect_actions(panel_open);
        &self.actions
    }

    fn collect_actions(&mut self, panel_open: bool) {
        let pressed = self.pressed;
        let hit = |btns: &[Btn]| btns.iter().any(|&b| pressed[b as usize]);

        let mut actions = Vec::with_capacity(4);
        if hit(&self.action_map.quit) {
            actions.push(UiAction::Quit);
        }
        if hit(&self.action_map.settings) {
            actions.push(UiAction::ToggleSettings);
        }
        if hit(&self.action_map.start) {
            actions.push(UiAction::Start);
        }
        if panel_open {
            let nav = [UiAction::PanelUp, UiAction::PanelDown, UiAction::PanelLeft, UiAction::PanelRight];
            for (fired, action) in self.dirs.iter().zip(nav) {
                if *fired {
                    actions.push(action);
                }
            }
        }
        self.actions = actions;
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.press(btn);
                }
                EventType::AxisChanged(axis, value, _) => match axis {
                    Axis::LeftStickX => self.stick.0 = value,
                    Axis::LeftStickY => self.stick.1 = value,
                    _ => {}
                },
                EventType::Connected => {
                    info!("gamepad connected");
                    self.connected = true;
                }
                EventType::Disconnected => {
                    info!("gamepad disconnected");
                    self.connected = false;
                    self.stick = (0.0, 0.0);
                    self.stick_held = [false; 4];
                }
                _ => {}
            }
        }

        // Stick crossing the deadzone counts as one press.
        let (x, y) = self.stick;
        let now = [y > STICK_DEADZONE, y < -STICK_DEADZONE, x < -STICK_DEADZONE, x > STICK_DEADZONE];
        for (i, held) in now.into_iter().enumerate() {
            if held && !self.stick_held[i] {
                self.dirs[i] = true;
            }
        }
        self.stick_held = now;
    }

    #[cfg(feature = "gamepad")]
    fn press(&mut self, gilrs_btn: Button) {
        let dir = match gilrs_btn {
            Button::DPadUp => Some(Dir::Up),
            Button::DPadDown => Some(Dir::Down),
            Button::DPadLeft => Some(Dir::Left),
            Button::DPadRight => Some(Dir::Right),
            _ => None,
        };
        if let Some(dir) = dir {
            self.dirs[dir as usize] = true;
            return;
        }
        if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.pressed[btn as usize] = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(start: &[&str], settings: &[&str], quit: &[&str]) -> GamepadConfig {
        let own = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        GamepadConfig {
            start: own(start),
            settings: own(settings),
            quit: own(quit),
        }
    }

    #[test]
    fn button_names_are_case_insensitive() {
        assert_eq!(Btn::from_name("start"), Some(Btn::Start));
        assert_eq!(Btn::from_name("South"), Some(Btn::A));
        assert_eq!(Btn::from_name("back"), Some(Btn::Select));
        assert_eq!(Btn::from_name("turbo"), None);
    }

    #[test]
    fn config_overrides_mapping() {
        let map = ActionMap::from_config(&cfg(&["B"], &["X", "Y"], &["Select"]));
        assert_eq!(map.start, vec![Btn::B]);
        assert_eq!(map.settings, vec![Btn::X, Btn::Y]);
        assert_eq!(map.quit, vec![Btn::Select]);
    }

    #[test]
    fn unknown_names_fall_back_to_defaults() {
        let map = ActionMap::from_config(&cfg(&["Turbo"], &[], &[]));
        assert_eq!(map.start, ActionMap::default().start);
        assert!(map.settings.is_empty());
    }

    #[test]
    fn pressed_buttons_become_actions() {
        let mut pad = GamepadState::new(&cfg(&["A"], &["Select"], &["B"]));
        pad.pressed[Btn::A as usize] = true;
        pad.pressed[Btn::B as usize] = true;
        pad.dirs[Dir::Down as usize] = true;

        pad.collect_actions(false);
        assert_eq!(pad.actions, vec![UiAction::Quit, UiAction::Start]);

        pad.collect_actions(true);
        assert_eq!(pad.actions, vec![UiAction::Quit, UiAction::Start, UiAction::PanelDown]);
    }
}
