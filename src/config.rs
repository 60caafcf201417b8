/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
/// Problems are collected in `warnings`; the logger is not up yet when
/// this runs, so `main` reports them once it is.

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::clock::DEFAULT_TURN_LENGTH;
use crate::domain::entity::DEFAULT_DEATH_TIME;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub display: DisplayConfig,
    pub gamepad: GamepadConfig,
    /// `None` → built-in stages only.
    pub stages_dir: Option<PathBuf>,
    pub log_file: PathBuf,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub frame_ms: u64,
    pub turn_length: f32,
    pub death_time: f32,
    pub purple_fade_time: f32,
}

/// Terminal cells per tile.
#[derive(Clone, Debug)]
pub struct DisplayConfig {
    pub tile_width: u16,
    pub tile_height: u16,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub reset: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

/// Everything the simulation needs from the outside world, fixed for the
/// lifetime of a run. Built once and handed to each `World`.
#[derive(Clone, Debug, PartialEq)]
pub struct SimContext {
    pub turn_length: f32,
    pub death_time: f32,
    pub purple_fade_time: f32,
    /// Render positions are in tiles; multiply by this to get cells.
    pub tile_size: (f32, f32),
}

impl Default for SimContext {
    fn default() -> Self {
        SimContext {
            turn_length: DEFAULT_TURN_LENGTH,
            death_time: DEFAULT_DEATH_TIME,
            purple_fade_time: DEFAULT_DEATH_TIME,
            tile_size: (1.0, 1.0),
        }
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    display: TomlDisplay,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
    #[serde(default = "default_turn_length")]
    turn_length: f32,
    #[serde(default = "default_death_time")]
    death_time: f32,
    #[serde(default = "default_death_time")]
    purple_fade_time: f32,
}

#[derive(Deserialize, Debug)]
struct TomlDisplay {
    #[serde(default = "default_tile_width")]
    tile_width: u16,
    #[serde(default = "default_tile_height")]
    tile_height: u16,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_reset")]
    reset: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default)]
    stages_dir: Option<String>,
    #[serde(default = "default_log_file")]
    log_file: String,
}

// ── Defaults ──

fn default_frame_ms() -> u64 { 16 }
fn default_turn_length() -> f32 { DEFAULT_TURN_LENGTH }
fn default_death_time() -> f32 { DEFAULT_DEATH_TIME }
fn default_tile_width() -> u16 { 2 }
fn default_tile_height() -> u16 { 1 }

fn default_reset() -> Vec<String> { vec!["Select".into(), "Y".into()] }
fn default_confirm() -> Vec<String> { vec!["Start".into(), "A".into()] }
fn default_cancel() -> Vec<String> { vec!["B".into()] }
fn default_log_file() -> String { "tilepush.log".into() }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            frame_ms: default_frame_ms(),
            turn_length: default_turn_length(),
            death_time: default_death_time(),
            purple_fade_time: default_death_time(),
        }
    }
}

impl Default for TomlDisplay {
    fn default() -> Self {
        TomlDisplay {
            tile_width: default_tile_width(),
            tile_height: default_tile_height(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            stages_dir: None,
            log_file: default_log_file(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            reset: default_reset(),
            confirm: default_confirm(),
            cancel: default_cancel(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let mut warnings = vec![];
        let toml_cfg = load_toml(&search_dirs, &mut warnings);
        Self::from_toml(toml_cfg, &search_dirs, warnings)
    }

    /// Parse a config document directly, without touching the filesystem.
    #[cfg(test)]
    pub fn parse(text: &str) -> Self {
        let mut warnings = vec![];
        let toml_cfg = parse_toml(text, &mut warnings);
        Self::from_toml(toml_cfg, &[], warnings)
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf], mut warnings: Vec<String>) -> Self {
        let mut timing = toml_cfg.timing;
        if timing.frame_ms == 0 {
            warnings.push("timing.frame_ms must be positive, using 16".into());
            timing.frame_ms = default_frame_ms();
        }
        if timing.turn_length <= 0.0 {
            warnings.push(format!("timing.turn_length must be positive, using {DEFAULT_TURN_LENGTH}"));
            timing.turn_length = default_turn_length();
        }

        // Resolve stages directory against the candidate dirs
        let stages_dir = toml_cfg.general.stages_dir.map(|dir| {
            let path = PathBuf::from(&dir);
            if path.is_absolute() {
                return path;
            }
            search_dirs.iter()
                .map(|d| d.join(&dir))
                .find(|p| p.is_dir())
                .unwrap_or(path)
        });

        GameConfig {
            timing: TimingConfig {
                frame_ms: timing.frame_ms,
                turn_length: timing.turn_length,
                death_time: timing.death_time.max(0.0),
                purple_fade_time: timing.purple_fade_time.max(0.0),
            },
            display: DisplayConfig {
                tile_width: toml_cfg.display.tile_width.max(1),
                tile_height: toml_cfg.display.tile_height.max(1),
            },
            gamepad: GamepadConfig {
                reset: toml_cfg.gamepad.reset,
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
            },
            stages_dir,
            log_file: PathBuf::from(toml_cfg.general.log_file),
            warnings,
        }
    }

    pub fn sim_context(&self) -> SimContext {
        SimContext {
            turn_length: self.timing.turn_length,
            death_time: self.timing.death_time,
            purple_fade_time: self.timing.purple_fade_time,
            tile_size: (self.display.tile_width as f32, self.display.tile_height as f32),
        }
    }

    /// Frame duration in the simulation's frame units.
    pub fn frame_dt(&self) -> f32 {
        self.timing.frame_ms as f32 / default_frame_ms() as f32
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => return parse_toml(&text, warnings),
                Err(e) => {
                    warnings.push(format!("could not read {}: {e}", path.display()));
                }
            }
        }
    }
    TomlConfig::default()
}

fn parse_toml(text: &str, warnings: &mut Vec<String>) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warnings.push(format!("config.toml parse error, using defaults: {e}"));
            TomlConfig::default()
        }
    }
}
