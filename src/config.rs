//! # Reader configuration
//!
//! Settings are read once at startup from `~/.config/gamepad-reader/config.toml`.
//! A missing file falls back to defaults; a file that exists but does not parse
//! is an error.
//!
//! The device identity and the transfer timeout are fixed properties of the
//! supported gamepad and are not configurable.
//!
//! ```toml
//! poll_interval_ms = 100
//!
//! [display]
//! clear_screen = true
//! show_raw = true
//! ```

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::poller::{PollSettings, TRANSFER_TIMEOUT};

const CONFIG_DIR: &str = ".config/gamepad-reader";
const CONFIG_FILE: &str = "config.toml";

/// Console output options.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct DisplaySettings {
    /// Clear the terminal before each frame
    pub clear_screen: bool,
    /// Print the raw report as hex above the decoded values
    pub show_raw: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            clear_screen: true,
            show_raw: true,
        }
    }
}

/// Top-level settings file.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ReaderSettings {
    /// Idle time between transfers in milliseconds; limits CPU use only
    pub poll_interval_ms: u64,
    pub display: DisplaySettings,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            display: DisplaySettings::default(),
        }
    }
}

impl ReaderSettings {
    /// Loads the settings file from the user's config directory.
    pub async fn load() -> Result<Self> {
        Self::load_from(&default_config_path()).await
    }

    /// Loads settings from `path`, using defaults when the file does not exist.
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        let settings = Self::parse(&content)
            .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

        debug!("Loaded settings from {}: {:?}", path.display(), settings);
        Ok(settings)
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            transfer_timeout: TRANSFER_TIMEOUT,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    let mut path = get_home_dir();
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    path
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}
