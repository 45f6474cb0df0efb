use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub playlists: PlaylistsConfig,
    #[serde(default)]
    pub icons: IconsConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

/// External media player invocation. The stream URL is always appended last.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_player_binary")]
    pub binary: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Skip the lookup beside the executable and search `PATH` only.
    #[serde(default)]
    pub use_system_path: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistsConfig {
    /// Playlist mapping file. Relative paths resolve against the working directory.
    #[serde(default = "default_playlists_file")]
    pub file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IconsConfig {
    /// Directory holding `off.png` and `on.png`.
    #[serde(default = "default_icons_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// How long quit waits for interrupted players before killing them.
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
    #[serde(default = "default_reset_terminal")]
    pub reset_terminal: bool,
    #[serde(default = "default_reset_command")]
    pub reset_command: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            binary: default_player_binary(),
            args: Vec::new(),
            use_system_path: false,
        }
    }
}

impl Default for PlaylistsConfig {
    fn default() -> Self {
        Self {
            file: default_playlists_file(),
        }
    }
}

impl Default for IconsConfig {
    fn default() -> Self {
        Self {
            dir: default_icons_dir(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_ms: default_grace_ms(),
            reset_terminal: default_reset_terminal(),
            reset_command: default_reset_command(),
        }
    }
}

fn default_player_binary() -> String {
    "mplayer".to_string()
}

fn default_playlists_file() -> PathBuf {
    PathBuf::from("playlists.toml")
}

fn default_icons_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_grace_ms() -> u64 {
    3000
}

fn default_reset_terminal() -> bool {
    true
}

fn default_reset_command() -> Vec<String> {
    vec!["stty".to_string(), "sane".to_string()]
}

impl PollConfig {
    /// Zero would spin the interval timer; clamp to 1ms.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

impl ShutdownConfig {
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    /// The terminal reset command, or `None` when disabled or empty.
    pub fn reset_argv(&self) -> Option<&[String]> {
        if self.reset_terminal && !self.reset_command.is_empty() {
            Some(&self.reset_command)
        } else {
            None
        }
    }
}

impl Config {
    /// Load from the default location, writing defaults on first run.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
