//! Configuration loading and source folder resolution
//!
//! Bootstrap configuration comes from an optional TOML file. Every field has a
//! built-in default, so a missing file is not an error:
//!
//! ```toml
//! source_folder = "/home/me/Pictures/holiday"
//!
//! [engine]
//! preload_range = 10
//! undo_capacity = 50
//! auto_score = true
//! background = true
//!
//! [logging]
//! level = "info"
//! ```

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable consulted for the source folder
pub const SOURCE_FOLDER_ENV: &str = "PHOTOSIFT_SOURCE";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Folder with the photographs to sift (optional)
    #[serde(default)]
    pub source_folder: Option<PathBuf>,

    /// Carousel engine tuning
    #[serde(default)]
    pub engine: EngineSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Carousel engine settings
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// Radius (in items) around the cursor kept decoded
    #[serde(default = "default_preload_range")]
    pub preload_range: usize,

    /// Maximum number of restorable deletions (None = unbounded)
    #[serde(default)]
    pub undo_capacity: Option<usize>,

    /// Score items while loading them
    #[serde(default = "default_true")]
    pub auto_score: bool,

    /// Run the background worker (false = everything inline)
    #[serde(default = "default_true")]
    pub background: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            preload_range: default_preload_range(),
            undo_capacity: None,
            auto_score: true,
            background: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_preload_range() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the platform config file is
    /// used when present and built-in defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => {
                    warn!("No config file found, using built-in defaults");
                    return Ok(Self::default());
                }
            },
        };

        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.engine.undo_capacity == Some(0) {
            return Err(Error::Config(
                "engine.undo_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Platform config file location (`~/.config/photosift/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("photosift").join("config.toml"))
}

/// Source folder resolution, in priority order:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. TOML config file
/// 4. Current directory
pub fn resolve_source_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(SOURCE_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.source_folder {
        return path.clone();
    }

    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.engine.preload_range, 10);
        assert_eq!(config.engine.undo_capacity, None);
        assert!(config.engine.auto_score);
        assert!(config.engine.background);
        assert_eq!(config.logging.level, "info");
        assert!(config.source_folder.is_none());
    }

    #[test]
    fn test_partial_engine_section() {
        let config = TomlConfig::from_toml_str("[engine]\nundo_capacity = 3\n").unwrap();
        assert_eq!(config.engine.undo_capacity, Some(3));
        assert_eq!(config.engine.preload_range, 10);
    }

    #[test]
    fn test_zero_undo_capacity_rejected() {
        let err = TomlConfig::from_toml_str("[engine]\nundo_capacity = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_toml_is_error() {
        let err = TomlConfig::from_toml_str("engine = [").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }
}
