/// Settings panel: a cursor over the option fields.
///
/// The panel holds no option values of its own. It reads the controller's
/// current `GameOptions` and turns each Left/Right press into an
/// `OptionsPatch` for the changed field only.

use crate::options::{GameOptions, OptionsPatch, FOOD_COUNT_MAX, FOOD_COUNT_MIN, GRID_SIZE_MAX, GRID_SIZE_MIN};

/// Snake colors the panel cycles through.
pub const SNAKE_COLORS: &[&str] = &[
    "#00FF00", // Green
    "#FF0000", // Red
    "#0000FF", // Blue
    "#FFFF00", // Yellow
    "#FF00FF", // Magenta
    "#00FFFF", // Cyan
    "#FFA500", // Orange
    "#800080", // Purple
    "#008080", // Teal
    "#FFD700", // Gold
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelField {
    SnakeColor,
    Difficulty,
    Fps,
    GridSize,
    FoodCount,
}

impl PanelField {
    pub const ALL: [PanelField; 5] = [
        PanelField::SnakeColor,
        PanelField::Difficulty,
        PanelField::Fps,
        PanelField::GridSize,
        PanelField::FoodCount,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PanelField::SnakeColor => "Snake color",
            PanelField::Difficulty => "Difficulty",
            PanelField::Fps => "Fps",
            PanelField::GridSize => "Grid size",
            PanelField::FoodCount => "Food count",
        }
    }

    pub fn value(self, options: &GameOptions) -> String {
        match self {
            PanelField::SnakeColor => options.snake_color().unwrap_or("engine default").to_string(),
            PanelField::Difficulty => options.difficulty().label().to_string(),
            PanelField::Fps => options.fps().value().to_string(),
            PanelField::GridSize => format!("{}  ({GRID_SIZE_MIN}-{GRID_SIZE_MAX})", options.grid_size()),
            PanelField::FoodCount => format!("{}  ({FOOD_COUNT_MIN}-{FOOD_COUNT_MAX})", options.food_count()),
        }
    }
}

#[derive(Debug, Default)]
pub struct SettingsPanel {
    cursor: usize,
}

impl SettingsPanel {
    pub fn new() -> Self {
        SettingsPanel::default()
    }

    pub fn selected(&self) -> PanelField {
        PanelField::ALL[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn move_up(&mut self) {
        let n = PanelField::ALL.len();
        self.cursor = (self.cursor + n - 1) % n;
    }

    pub fn move_down(&mut self) {
        self.cursor = (self.cursor + 1) % PanelField::ALL.len();
    }

    /// Step the selected field by `delta` (±1). Returns `None` when the
    /// field is already at its bound.
    pub fn adjust(&self, options: &GameOptions, delta: i32) -> Option<OptionsPatch> {
        let forward = delta > 0;
        let patch = match self.selected() {
            PanelField::SnakeColor => OptionsPatch {
                snake_color: Some(cycle_color(options.snake_color(), forward).to_string()),
                ..Default::default()
            },
            PanelField::Difficulty => OptionsPatch {
                difficulty: Some(options.difficulty().toggled()),
                ..Default::default()
            },
            PanelField::Fps => OptionsPatch {
                fps: Some(if forward { options.fps().next() } else { options.fps().prev() }),
                ..Default::default()
            },
            PanelField::GridSize => OptionsPatch {
                grid_size: Some(step(options.grid_size(), delta, GRID_SIZE_MIN, GRID_SIZE_MAX)?),
                ..Default::default()
            },
            PanelField::FoodCount => OptionsPatch {
                food_count: Some(step(options.food_count(), delta, FOOD_COUNT_MIN, FOOD_COUNT_MAX)?),
                ..Default::default()
            },
        };
        Some(patch)
    }
}

fn step(value: u32, delta: i32, min: u32, max: u32) -> Option<u32> {
    let next = value.saturating_add_signed(delta).clamp(min, max);
    (next != value).then_some(next)
}

fn cycle_color(current: Option<&str>, forward: bool) -> &'static str {
    let n = SNAKE_COLORS.len();
    let pos = current.and_then(|c| SNAKE_COLORS.iter().position(|p| p.eq_ignore_ascii_case(c)));
    let i = match (pos, forward) {
        (Some(i), true) => (i + 1) % n,
        (Some(i), false) => (i + n - 1) % n,
        (None, true) => 0,
        (None, false) => n - 1,
    };
    SNAKE_COLORS[i]
}
