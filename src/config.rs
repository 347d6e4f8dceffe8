/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory, the CWD, or
/// `~/.local/share/snakehost`. Falls back to defaults if the file is
/// missing or incomplete.
///
/// ```toml
/// [general]
/// data_dir = ""              # empty: exe dir if writable, else ~/.local/share/snakehost
/// persist_settings = true
/// log_filter = "info"
///
/// [engine]
/// program = "snake-engine"
/// args = []
///
/// [leaderboard]
/// source = "leaderboard.json"   # file path or http(s):// URL
/// dev_source = ""               # used instead by debug builds when set
/// timeout_ms = 5000
///
/// [ui]
/// frame_ms = 33
/// prompt_tick_ms = 1000
///
/// [gamepad]
/// start = ["A", "Start"]
/// settings = ["Select", "Y"]
/// quit = []
/// ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::engine::process::EngineCommand;

const APP_DIR: &str = "snakehost";

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub persist_settings: bool,
    pub log_filter: String,
    pub engine: EngineCommand,
    pub leaderboard: LeaderboardConfig,
    pub ui: UiConfig,
    pub gamepad: GamepadConfig,
}

#[derive(Clone, Debug)]
pub struct LeaderboardConfig {
    /// The location for this build: `dev_source` in debug builds when set,
    /// otherwise `source`.
    pub location: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct UiConfig {
    pub frame: Duration,
    pub prompt_tick: Duration,
}

#[derive(Clone, Debug, Default)]
pub struct GamepadConfig {
    pub start: Vec<String>,
    pub settings: Vec<String>,
    pub quit: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    engine: TomlEngine,
    #[serde(default)]
    leaderboard: TomlLeaderboard,
    #[serde(default)]
    ui: TomlUi,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default)]
    data_dir: String,
    #[serde(default = "default_true")]
    persist_settings: bool,
    #[serde(default = "default_log_filter")]
    log_filter: String,
}

#[derive(Deserialize, Debug)]
struct TomlEngine {
    #[serde(default = "default_engine_program")]
    program: String,
    #[serde(default)]
    args: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlLeaderboard {
    #[serde(default = "default_leaderboard_source")]
    source: String,
    #[serde(default)]
    dev_source: String,
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlUi {
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
    #[serde(default = "default_prompt_tick_ms")]
    prompt_tick_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_start")]
    start: Vec<String>,
    #[serde(default = "default_settings")]
    settings: Vec<String>,
    #[serde(default)]
    quit: Vec<String>,
}

// ── Defaults ──

fn default_true() -> bool { true }
fn default_log_filter() -> String { "info".into() }
fn default_engine_program() -> String { "snake-engine".into() }
fn default_leaderboard_source() -> String { "leaderboard.json".into() }
fn default_timeout_ms() -> u64 { 5000 }
fn default_frame_ms() -> u64 { 33 }        // ~30 redraws per second
fn default_prompt_tick_ms() -> u64 { 1000 }
fn default_start() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_settings() -> Vec<String> { vec!["Select".into(), "Y".into()] }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            data_dir: String::new(),
            persist_settings: default_true(),
            log_filter: default_log_filter(),
        }
    }
}

impl Default for TomlEngine {
    fn default() -> Self {
        TomlEngine {
            program: default_engine_program(),
            args: Vec::new(),
        }
    }
}

impl Default for TomlLeaderboard {
    fn default() -> Self {
        TomlLeaderboard {
            source: default_leaderboard_source(),
            dev_source: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for TomlUi {
    fn default() -> Self {
        TomlUi {
            frame_ms: default_frame_ms(),
            prompt_tick_ms: default_prompt_tick_ms(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            start: default_start(),
            settings: default_settings(),
            quit: Vec::new(),
        }
    }
}

// ── Loading ──

impl AppConfig {
    /// Load config from `config.toml`.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        let data_dir = if toml_cfg.general.data_dir.is_empty() {
            default_data_dir()
        } else {
            PathBuf::from(&toml_cfg.general.data_dir)
        };
        AppConfig::build(toml_cfg, &search_dirs, data_dir, cfg!(debug_assertions))
    }

    fn build(cfg: TomlConfig, search_dirs: &[PathBuf], data_dir: PathBuf, debug_build: bool) -> Self {
        let source = if debug_build && !cfg.leaderboard.dev_source.is_empty() {
            cfg.leaderboard.dev_source
        } else {
            cfg.leaderboard.source
        };
        let location = if source.contains("://") {
            source
        } else {
            resolve(&source, search_dirs).to_string_lossy().into_owned()
        };

        // A bare program name is left for PATH lookup unless it sits next to us.
        let program = resolve(&cfg.engine.program, search_dirs);

        AppConfig {
            data_dir,
            persist_settings: cfg.general.persist_settings,
            log_filter: cfg.general.log_filter,
            engine: EngineCommand {
                program,
                args: cfg.engine.args,
            },
            leaderboard: LeaderboardConfig {
                location,
                timeout: Duration::from_millis(cfg.leaderboard.timeout_ms.max(1)),
            },
            ui: UiConfig {
                frame: Duration::from_millis(cfg.ui.frame_ms.clamp(5, 1000)),
                prompt_tick: Duration::from_millis(cfg.ui.prompt_tick_ms.max(50)),
            },
            gamepad: GamepadConfig {
                start: cfg.gamepad.start,
                settings: cfg.gamepad.settings,
                quit: cfg.gamepad.quit,
            },
        }
    }
}

/// A relative path is looked up in the candidate dirs; if it exists in
/// none of them it is returned unchanged.
fn resolve(name: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = PathBuf::from(name);
    if path.is_absolute() {
        return path;
    }
    search_dirs
        .iter()
        .map(|d| d.join(&path))
        .find(|p| p.exists())
        .unwrap_or(path)
}

/// Candidate directories to search: exe dir + CWD + XDG data dir (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Some(parent) = exe_dir() {
        dirs.push(parent);
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/snakehost)
    if let Some(xdg) = xdg_dir() {
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

fn exe_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    // Resolve symlinks so an installed link still finds files next to the real binary.
    let resolved = exe.canonicalize().unwrap_or(exe);
    resolved.parent().map(Path::to_path_buf)
}

fn xdg_dir() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".local/share").join(APP_DIR))
}

/// Where settings and the log go: exe dir if writable (portable installs),
/// else `~/.local/share/snakehost`, else the CWD.
fn default_data_dir() -> PathBuf {
    if let Some(dir) = exe_dir() {
        if is_writable(&dir) {
            return dir;
        }
    }
    if let Some(xdg) = xdg_dir() {
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn is_writable(dir: &Path) -> bool {
    let probe = dir.join(".write_test_snakehost");
    match std::fs::write(&probe, "") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        // Logging is not up yet; the terminal is still ours.
                        eprintln!("Warning: config.toml parse error: {e}");
                        eprintln!("Using default settings.");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(text: &str, dirs: &[PathBuf], debug_build: bool) -> AppConfig {
        let cfg: TomlConfig = toml::from_str(text).unwrap();
        AppConfig::build(cfg, dirs, PathBuf::from("/data"), debug_build)
    }

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = build("", &[], false);
        assert!(cfg.persist_settings);
        assert_eq!(cfg.log_filter, "info");
        assert_eq!(cfg.engine.program, PathBuf::from("snake-engine"));
        assert!(cfg.engine.args.is_empty());
        assert_eq!(cfg.leaderboard.location, "leaderboard.json");
        assert_eq!(cfg.leaderboard.timeout, Duration::from_secs(5));
        assert_eq!(cfg.ui.frame, Duration::from_millis(33));
        assert_eq!(cfg.ui.prompt_tick, Duration::from_secs(1));
        assert_eq!(cfg.gamepad.start, vec!["A", "Start"]);
        assert!(cfg.gamepad.quit.is_empty());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let text = r#"
            [engine]
            args = ["--windowed"]

            [ui]
            prompt_tick_ms = 500
        "#;
        let cfg = build(text, &[], false);
        assert_eq!(cfg.engine.program, PathBuf::from("snake-engine"));
        assert_eq!(cfg.engine.args, vec!["--windowed"]);
        assert_eq!(cfg.ui.prompt_tick, Duration::from_millis(500));
        assert_eq!(cfg.ui.frame, Duration::from_millis(33));
    }

    #[test]
    fn dev_source_only_in_debug_builds() {
        let text = r#"
            [leaderboard]
            source = "http://scores.example/leaderboard.json"
            dev_source = "http://localhost:5173/leaderboard.json"
        "#;
        assert_eq!(
            build(text, &[], true).leaderboard.location,
            "http://localhost:5173/leaderboard.json"
        );
        assert_eq!(
            build(text, &[], false).leaderboard.location,
            "http://scores.example/leaderboard.json"
        );
    }

    #[test]
    fn relative_paths_resolve_against_search_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("leaderboard.json"), "[]").unwrap();
        std::fs::write(dir.path().join("snake-engine"), "").unwrap();

        let cfg = build("", &[dir.path().to_path_buf()], false);
        assert_eq!(
            PathBuf::from(&cfg.leaderboard.location),
            dir.path().join("leaderboard.json")
        );
        assert_eq!(cfg.engine.program, dir.path().join("snake-engine"));
    }

    #[test]
    fn zero_timings_are_clamped() {
        let text = r#"
            [leaderboard]
            timeout_ms = 0
            [ui]
            frame_ms = 0
            prompt_tick_ms = 0
        "#;
        let cfg = build(text, &[], false);
        assert_eq!(cfg.leaderboard.timeout, Duration::from_millis(1));
        assert_eq!(cfg.ui.frame, Duration::from_millis(5));
        assert_eq!(cfg.ui.prompt_tick, Duration::from_millis(50));
    }

    #[test]
    fn writable_probe() {
        let dir = tempfile::tempdir().unwrap();
        assert!(is_writable(dir.path()));
        assert!(!is_writable(&dir.path().join("missing")));
    }
}
