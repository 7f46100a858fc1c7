// Configuration management for muzak
// Handles loading/saving settings, with sensible defaults when config is missing

use anyhow::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory scanned (non-recursively) for muzak files.
    pub music_dir: PathBuf,
    /// Where the Stop Marker for the active session lives. `start` and
    /// `stop` may run as separate processes, so this path is the only
    /// thing they share.
    pub marker_path: PathBuf,
    /// Optional playback command override, e.g. "mpv --no-video".
    /// When unset the platform default is auto-detected.
    pub player: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            music_dir: dirs::audio_dir()
                .map(|dir| dir.join("muzak"))
                .unwrap_or_else(|| PathBuf::from("muzakfiles")),
            marker_path: env::temp_dir().join("muzak-session.json"),
            player: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from an explicit path; writes the defaults there on first run.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content)?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("muzak");

        Ok(config_dir.join("config.toml"))
    }
}
