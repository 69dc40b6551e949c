use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::AppConfig;

const CONFIG_DIR: &str = "lazyview";
const CONFIG_FILE: &str = "config.toml";

pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(CONFIG_DIR))
}

pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

/// Load the config from the default location, falling back to defaults.
pub fn load() -> color_eyre::Result<AppConfig> {
    config_path().map_or_else(
        || {
            debug!("No config directory found, using defaults");
            Ok(AppConfig::default())
        },
        |path| load_from(&path),
    )
}

/// Load the config from `path`. A missing file yields the defaults.
pub fn load_from(path: &Path) -> color_eyre::Result<AppConfig> {
    if !path.exists() {
        debug!(?path, "Config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    let content = fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    debug!(?path, "Loaded config");
    Ok(config)
}
