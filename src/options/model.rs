/// Player-configurable game options.
///
/// `GameOptions` is a value object: every change produces a new value through
/// `merged()`. Bounded fields are private so an out-of-range grid or food count
/// can never be constructed, and the frame threshold is derived from `fps`
/// instead of being stored next to it.
///
/// ## JSON record
///   {"canvasId":"canvas","difficulty":"easy","snakeColor":"#FF0000",
///    "gridSize":30,"foodCount":5,"fps":10,"frameThresholdMs":100.0}
///
/// `id` is accepted for `canvasId` (earlier schema), `snakeColor` may be absent,
/// and `frameThresholdMs` is ignored on read.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::OptionsError;

pub const GRID_SIZE_MIN: u32 = 20;
pub const GRID_SIZE_MAX: u32 = 40;
pub const FOOD_COUNT_MIN: u32 = 1;
pub const FOOD_COUNT_MAX: u32 = 20;

const DEFAULT_CANVAS_ID: &str = "canvas";
const DEFAULT_GRID_SIZE: u32 = 30;
const DEFAULT_FOOD_COUNT: u32 = 5;

// ── Difficulty ──

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Hard,
}

impl Difficulty {
    pub fn toggled(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Easy,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Hard => "Hard",
        }
    }
}

// ── Fps ──

/// Engine frame rate. Only the three rates the engine supports exist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Fps {
    #[default]
    Ten,
    Thirty,
    Sixty,
}

impl Fps {
    pub const ALL: [Fps; 3] = [Fps::Ten, Fps::Thirty, Fps::Sixty];

    pub fn value(self) -> u32 {
        match self {
            Fps::Ten => 10,
            Fps::Thirty => 30,
            Fps::Sixty => 60,
        }
    }

    pub fn frame_threshold_ms(self) -> f64 {
        1000.0 / self.value() as f64
    }

    /// Next rate, wrapping around.
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    /// Previous rate, wrapping around.
    pub fn prev(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl TryFrom<u32> for Fps {
    type Error = OptionsError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Fps::ALL
            .into_iter()
            .find(|f| f.value() == value)
            .ok_or(OptionsError::UnsupportedFps(value))
    }
}

impl From<Fps> for u32 {
    fn from(fps: Fps) -> u32 {
        fps.value()
    }
}

// ── GameOptions ──

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "OptionsRecord", try_from = "OptionsRecord")]
pub struct GameOptions {
    canvas_id: String,
    difficulty: Difficulty,
    snake_color: Option<String>,
    grid_size: u32,
    food_count: u32,
    fps: Fps,
}

impl Default for GameOptions {
    fn default() -> Self {
        GameOptions {
            canvas_id: DEFAULT_CANVAS_ID.to_string(),
            difficulty: Difficulty::default(),
            snake_color: None,
            grid_size: DEFAULT_GRID_SIZE,
            food_count: DEFAULT_FOOD_COUNT,
            fps: Fps::default(),
        }
    }
}

impl GameOptions {
    pub fn canvas_id(&self) -> &str {
        &self.canvas_id
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn snake_color(&self) -> Option<&str> {
        self.snake_color.as_deref()
    }

    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    pub fn food_count(&self) -> u32 {
        self.food_count
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Always `1000 / fps`.
    pub fn frame_threshold_ms(&self) -> f64 {
        self.fps.frame_threshold_ms()
    }

    /// Apply a partial update and return the resulting full value.
    /// Integers are clamped into their bounds; an invalid color is dropped.
    pub fn merged(&self, patch: &OptionsPatch) -> GameOptions {
        let mut next = self.clone();
        if let Some(difficulty) = patch.difficulty {
            next.difficulty = difficulty;
        }
        if let Some(color) = &patch.snake_color {
            if is_hex_color(color) {
                next.snake_color = Some(color.clone());
            } else {
                warn!(color = %color, "ignoring invalid snake color");
            }
        }
        if let Some(grid_size) = patch.grid_size {
            next.grid_size = grid_size.clamp(GRID_SIZE_MIN, GRID_SIZE_MAX);
        }
        if let Some(food_count) = patch.food_count {
            next.food_count = food_count.clamp(FOOD_COUNT_MIN, FOOD_COUNT_MAX);
        }
        if let Some(fps) = patch.fps {
            next.fps = fps;
        }
        next
    }
}

/// Partial options update produced by the settings panel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OptionsPatch {
    pub difficulty: Option<Difficulty>,
    pub snake_color: Option<String>,
    pub grid_size: Option<u32>,
    pub food_count: Option<u32>,
    pub fps: Option<Fps>,
}

/// `#RRGGBB`, `RRGGBB`, or the same with an alpha byte.
pub fn is_hex_color(s: &str) -> bool {
    let digits = s.strip_prefix('#').unwrap_or(s);
    matches!(digits.len(), 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

// ── Wire record ──

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionsRecord {
    #[serde(alias = "id")]
    canvas_id: String,
    difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    snake_color: Option<String>,
    grid_size: u32,
    food_count: u32,
    fps: Fps,
    #[serde(default, skip_deserializing)]
    frame_threshold_ms: f64,
}

impl From<GameOptions> for OptionsRecord {
    fn from(o: GameOptions) -> Self {
        OptionsRecord {
            frame_threshold_ms: o.frame_threshold_ms(),
            canvas_id: o.canvas_id,
            difficulty: o.difficulty,
            snake_color: o.snake_color,
            grid_size: o.grid_size,
            food_count: o.food_count,
            fps: o.fps,
        }
    }
}

impl TryFrom<OptionsRecord> for GameOptions {
    type Error = OptionsError;

    fn try_from(r: OptionsRecord) -> Result<Self, Self::Error> {
        if !(GRID_SIZE_MIN..=GRID_SIZE_MAX).contains(&r.grid_size) {
            return Err(OptionsError::OutOfRange { field: "gridSize", value: r.grid_size });
        }
        if !(FOOD_COUNT_MIN..=FOOD_COUNT_MAX).contains(&r.food_count) {
            return Err(OptionsError::OutOfRange { field: "foodCount", value: r.food_count });
        }
        if let Some(color) = &r.snake_color {
            if !is_hex_color(color) {
                return Err(OptionsError::InvalidColor(color.clone()));
            }
        }
        Ok(GameOptions {
            canvas_id: r.canvas_id,
            difficulty: r.difficulty,
            snake_color: r.snake_color,
            grid_size: r.grid_size,
            food_count: r.food_count,
            fps: r.fps,
        })
    }
}
