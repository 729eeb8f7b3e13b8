use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use beatflux::DetectorConfig;

use crate::cli::Cli;
use crate::playback::PlaybackMode;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

#[derive(Debug, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default)]
    pub mode: PlaybackMode,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            mode: PlaybackMode::default(),
        }
    }
}

fn default_fps() -> u32 { 60 }

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Explicit path, else `./beatflux.toml`, else `<config dir>/beatflux/config.toml`.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("beatflux.toml");
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("beatflux").join("config.toml"))
        .filter(|path| path.exists())
}

impl Config {
    /// Command-line flags win over file values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        let detector = &mut self.detector;
        if let Some(bins) = cli.bins {
            detector.bin_count = bins;
        }
        if let Some(multiplier) = cli.multiplier {
            detector.threshold_multiplier = multiplier;
        }
        if let Some(window) = cli.window {
            detector.threshold_window_size = window;
        }
        if let Some(filter_window) = cli.filter_window {
            detector.filter_window_size = filter_window;
        }
        if let Some(time_filter) = cli.time_filter {
            detector.time_filter = time_filter;
        }
        if let Some(fps) = cli.fps {
            self.playback.fps = fps;
        }
        if let Some(mode) = cli.mode {
            self.playback.mode = mode;
        }
    }
}
