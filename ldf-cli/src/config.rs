//! Configuration loading and parsing

use anyhow::{Context, Result};
use ldf_editor::EditorConfig;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Main application configuration (loaded from a TOML file)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Level used when no `-v`/`-q` flag is given ("error" .. "trace", "off")
    pub level: Option<String>,
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<Option<LevelFilter>> {
        self.level
            .as_deref()
            .map(|level| {
                LevelFilter::from_str(level)
                    .ok()
                    .with_context(|| format!("Invalid log level in config: {:?}", level))
            })
            .transpose()
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}
