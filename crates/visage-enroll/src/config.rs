use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use visage_search::DEFAULT_TOLERANCE;

/// Default cap on images accepted by one registration request.
pub const DEFAULT_MAX_IMAGES_PER_REQUEST: usize = 10;

/// Configuration for visage.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (VISAGE_* prefix)
/// 3. Config file (~/.config/visage/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite database.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: VISAGE_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/visage/visage.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    /// Maximum distance for a face to be recognized.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Maximum number of images in one registration request.
    #[serde(default = "default_max_images")]
    pub max_images_per_request: usize,

    /// Reject encodings of any other dimension. Unset trusts the encoder.
    #[serde(default)]
    pub expected_dimension: Option<usize>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The `[logging]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_coloured")]
    pub coloured: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            coloured: default_coloured(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            tolerance: default_tolerance(),
            max_images_per_request: default_max_images(),
            expected_dimension: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/visage/config.toml
    /// Reads environment variables with VISAGE_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("visage");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder
            .build()
            .context("Failed to build configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with custom database path.
    ///
    /// This is used when the --db CLI flag is provided.
    pub fn load_with_db_path(db_path: PathBuf) -> Result<Self> {
        let mut config = Self::load()?;
        config.database_path = db_path;
        Ok(config)
    }

    /// Reject values no workflow could run with.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            anyhow::bail!("tolerance must be a non-negative number, got {}", self.tolerance);
        }
        if self.max_images_per_request == 0 {
            anyhow::bail!("max_images_per_request must be at least 1");
        }
        if self.expected_dimension == Some(0) {
            anyhow::bail!("expected_dimension must be at least 1 when set");
        }
        Ok(())
    }

    /// The effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Get the default database path.
///
/// Returns: ~/.local/share/visage/visage.db (or platform equivalent)
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("visage")
        .join("visage.db")
}

const fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

const fn default_max_images() -> usize {
    DEFAULT_MAX_IMAGES_PER_REQUEST
}

fn default_log_level() -> String {
    String::from("info")
}

const fn default_coloured() -> bool {
    true
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/visage/config.toml
/// - macOS: ~/Library/Application Support/visage/config.toml
/// - Windows: %APPDATA%\visage\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("visage")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Visage Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (VISAGE_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Path to the SQLite database holding identities and their face encodings
#
# Can also be set via:
# - CLI: visage --db /custom/path.db list
# - Environment: VISAGE_DATABASE_PATH=/custom/path.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/visage.db"

# Maximum face distance for a match. Lower is stricter.
tolerance = 0.5

# Maximum number of images accepted by one registration request
max_images_per_request = 10

# Reject encodings whose dimension differs (128 for the usual face model).
# Leave unset to trust the encoder.
#expected_dimension = 128

[logging]
level = "info"
coloured = true
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.database_path.as_os_str().is_empty());
        assert_eq!(config.tolerance, 0.5);
        assert_eq!(config.max_images_per_request, 10);
        assert!(config.expected_dimension.is_none());
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load() {
        // Should not fail even if config file doesn't exist
        let result = Config::load();
        assert!(result.is_ok());
    }

    #[test]
    fn test_config_with_custom_db_path() {
        let custom_path = PathBuf::from("/tmp/test.db");
        let config = Config::load_with_db_path(custom_path.clone());
        assert!(config.is_ok());
        assert_eq!(config.unwrap().database_path, custom_path);
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config.tolerance, 0.5);
        assert_eq!(config.max_images_per_request, 10);
        assert!(config.logging.coloured);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.tolerance = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.max_images_per_request = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.expected_dimension = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_to_toml_round_trip() {
        let mut config = Config::default();
        config.expected_dimension = Some(128);
        let text = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
