/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// What is drawn depends only on the session state:
///   Loading       spinner
///   InitFailed    error box with retry hint
///   Playing       HUD with score
///   Settings      HUD + settings panel on the left
///   StartPrompt   prompt overlay (leaderboard + animated prompt)
///   GameOver      prompt overlay with title and final score

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use super::panel::{PanelField, SettingsPanel};
use super::prompt::PromptText;
use crate::leaderboard::Leaderboard;
use crate::options::GameOptions;
use crate::session::GameState;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for every cell, so the gap between rows on
    /// VTE terminals matches the cell color.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Never equal to a real cell; forces a full repaint.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    /// Write a string horizontally centered on row y.
    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let len = s.chars().count();
        let x = self.width.saturating_sub(len) / 2;
        self.put_str(x, y, s, fg, bg);
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, bg: Color) {
        for yy in y..y + h {
            for xx in x..x + w {
                self.set(xx, yy, Cell::new(' ', Color::White, bg));
            }
        }
    }

    #[cfg(test)]
    fn row_text(&self, y: usize) -> String {
        (0..self.width).map(|x| self.get(x, y).ch).collect()
    }
}

// ── Palette ──

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const PANEL_BG: Color = Color::Rgb { r: 34, g: 34, b: 34 };
const OVERLAY_BG: Color = Color::Rgb { r: 12, g: 12, b: 18 };
const TITLE: Color = Color::Rgb { r: 204, g: 204, b: 204 };
const ACCENT: Color = Color::Rgb { r: 100, g: 200, b: 255 };
const GOLD: Color = Color::Rgb { r: 255, g: 220, b: 50 };
const MUTED: Color = Color::Rgb { r: 128, g: 128, b: 128 };
const ERROR: Color = Color::Rgb { r: 240, g: 90, b: 90 };

const HUD_ROW: usize = 0;
const PANEL_W: usize = 36;
const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

/// Everything one frame needs, borrowed from the host loop.
pub struct RenderView<'a> {
    pub state: &'a GameState,
    pub options: &'a GameOptions,
    pub panel: &'a SettingsPanel,
    pub prompt: &'a PromptText,
    pub leaderboard: &'a Leaderboard,
    pub gamepad: bool,
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_state: Option<&'static str>,
    frame: u64,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_state: None,
            frame: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, view: &RenderView<'_>) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // State change → clear for a clean transition.
        let label = view.state.label();
        if self.last_state != Some(label) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_state = Some(label);
        }

        self.compose(view);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        self.frame = self.frame.wrapping_add(1);

        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colors; ResetColor would fall back to the terminal's own.
        queue!(
            self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }

                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose(&mut self, view: &RenderView<'_>) {
        self.front.clear();

        match view.state {
            GameState::Loading => self.compose_loading(),
            GameState::InitFailed { reason } => self.compose_init_failed(reason),
            GameState::Playing { score } => {
                self.compose_hud(view, *score);
                self.compose_help(view, "F1/Tab: Settings   q: Quit");
            }
            GameState::Settings { score } => {
                self.compose_hud(view, *score);
                self.compose_panel(view);
                self.compose_help(view, "Up/Down: Select   Left/Right: Change   Esc/F1: Close");
            }
            GameState::StartPrompt => {
                self.compose_hud(view, 0);
                self.compose_prompt_overlay(view, None);
            }
            GameState::GameOver { score } => {
                self.compose_hud(view, *score);
                self.compose_prompt_overlay(view, Some(*score));
            }
        }
    }

    fn compose_loading(&mut self) {
        let mid = self.front.height / 2;
        let spin = SPINNER[(self.frame / 4) as usize % SPINNER.len()];
        self.front.put_centered(mid, &format!("{spin}  Loading engine  {spin}"), TITLE, Color::Reset);
        self.front.put_centered(mid + 2, "q: Quit", MUTED, Color::Reset);
    }

    fn compose_init_failed(&mut self, reason: &str) {
        let w = self.front.width;
        let box_w = 56_usize.min(w);
        let box_h = 8_usize.min(self.front.height);
        let box_x = w.saturating_sub(box_w) / 2;
        let box_y = self.front.height.saturating_sub(box_h) / 2;
        self.front.fill_rect(box_x, box_y, box_w, box_h, OVERLAY_BG);

        self.front.put_centered(box_y + 1, "Engine unavailable", ERROR, OVERLAY_BG);
        let reason: String = reason.chars().take(box_w.saturating_sub(4)).collect();
        self.front.put_centered(box_y + 3, &reason, TITLE, OVERLAY_BG);
        self.front.put_centered(box_y + 5, "Space: Retry   q: Quit", ACCENT, OVERLAY_BG);
    }

    fn compose_hud(&mut self, view: &RenderView<'_>, score: u32) {
        let w = self.front.width;
        for x in 0..w {
            self.front.set(x, HUD_ROW, Cell::new(' ', Color::White, HUD_BG));
        }

        let o = view.options;
        let left = format!(
            " SNAKE  {} · {} fps · {}x{} · food {}",
            o.difficulty().label(),
            o.fps().value(),
            o.grid_size(),
            o.grid_size(),
            o.food_count(),
        );
        self.front.put_str(0, HUD_ROW, &left, Color::White, HUD_BG);

        let right = format!("Score: {score} ");
        let rx = w.saturating_sub(right.chars().count());
        self.front.put_str(rx, HUD_ROW, &right, GOLD, HUD_BG);
    }

    fn compose_help(&mut self, view: &RenderView<'_>, keys: &str) {
        let row = self.front.height.saturating_sub(1);
        let pad = if view.gamepad { "   Pad: connected" } else { "" };
        self.front.put_str(1, row, &format!("{keys}{pad}"), MUTED, Color::Reset);
    }

    fn compose_panel(&mut self, view: &RenderView<'_>) {
        let h = self.front.height.saturating_sub(2);
        let w = PANEL_W.min(self.front.width);
        self.front.fill_rect(0, 1, w, h, PANEL_BG);

        self.front.put_str(2, 2, "Settings", TITLE, PANEL_BG);
        self.front.put_str(2, 3, &"─".repeat(w.saturating_sub(4)), MUTED, PANEL_BG);

        let mut y = 5;
        for (i, field) in PanelField::ALL.into_iter().enumerate() {
            let selected = i == view.panel.cursor();
            let (marker, fg) = if selected { ("▶ ", ACCENT) } else { ("  ", TITLE) };
            self.front.put_str(2, y, &format!("{marker}{}", field.label()), fg, PANEL_BG);

            let value = field.value(view.options);
            let value_fg = match (field, view.options.snake_color()) {
                (PanelField::SnakeColor, Some(hex)) => hex_color(hex).unwrap_or(TITLE),
                _ => TITLE,
            };
            let shown = if selected { format!("< {value} >") } else { value };
            self.front.put_str(6, y + 1, &shown, value_fg, PANEL_BG);
            y += 3;
        }
    }

    fn compose_prompt_overlay(&mut self, view: &RenderView<'_>, final_score: Option<u32>) {
        let w = self.front.width;
        let box_w = 44_usize.min(w);
        let rows = view.leaderboard.entries().len();
        let title_h = if final_score.is_some() { 4 } else { 0 };
        let box_h = (title_h + rows + 9).min(self.front.height.saturating_sub(2));
        let box_x = w.saturating_sub(box_w) / 2;
        let box_y = 1 + self.front.height.saturating_sub(box_h + 1) / 2;
        self.front.fill_rect(box_x, box_y, box_w, box_h, OVERLAY_BG);

        let mut y = box_y + 1;
        if let Some(score) = final_score {
            self.front.put_centered(y, "Game Over!", TITLE, OVERLAY_BG);
            self.front.put_centered(y + 1, &format!("Your score: {score}"), GOLD, OVERLAY_BG);
            y += title_h;
        }

        self.front.put_centered(y, "Leaderboard", Color::White, OVERLAY_BG);
        y += 1;
        let col_x = box_x + 4;
        self.front.put_str(col_x, y, &format!("{:<6}{:<20}{:>6}", "Rank", "Name", "Score"), MUTED, OVERLAY_BG);
        y += 1;
        self.front.put_str(col_x, y, &"─".repeat(32), MUTED, OVERLAY_BG);
        y += 1;
        for (rank, entry) in view.leaderboard.ranked() {
            if y >= box_y + box_h.saturating_sub(3) {
                break;
            }
            let name: String = entry.name.chars().take(19).collect();
            let line = format!("{rank:<6}{name:<20}{:>6}", entry.score);
            self.front.put_str(col_x, y, &line, Color::White, OVERLAY_BG);
            y += 1;
        }

        let prompt_y = box_y + box_h.saturating_sub(2);
        // Left-aligned so the text does not shift as dots are added.
        let base_w = super::prompt::PROMPT_BASE.len() + 3;
        let px = w.saturating_sub(base_w) / 2;
        self.front.put_str(px, prompt_y, view.prompt.as_str(), TITLE, OVERLAY_BG);
    }
}

/// `#RRGGBB` (alpha ignored) → terminal color.
fn hex_color(s: &str) -> Option<Color> {
    let digits = s.strip_prefix('#').unwrap_or(s);
    let byte = |i: usize| digits.get(i..i + 2).and_then(|h| u8::from_str_radix(h, 16).ok());
    Some(Color::Rgb { r: byte(0)?, g: byte(2)?, b: byte(4)? })
}
