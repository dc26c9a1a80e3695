//! Shell configuration
//!
//! Read once at startup. A missing file means defaults; the kiosk must come
//! up even on a fresh install.

use crate::input::{EngineSettings, Orientation};
use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = "kiosknav";
const CONFIG_FILE: &str = "config.toml";

/// Launcher settings.
///
/// ```toml
/// orientation = "horizontal"
/// multiple_displays = true
///
/// [engine]
/// repeat_interval_ms = 180
/// ```
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Which arrow pair drives navigation
    pub orientation: Orientation,
    /// Whether ToggleDisplay should be wired
    pub multiple_displays: bool,
    pub engine: EngineSettings,
}

impl AppConfig {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| {
            warn!("Could not determine config directory, using current directory");
            PathBuf::from(".")
        });
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| eyre!("Failed to parse config: {}", e))
    }

    /// Loads the config at `path`, falling back to defaults if it does not exist
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        let config = Self::from_toml_str(&content)?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}
