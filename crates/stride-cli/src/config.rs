//! Configuration file management for stride.
//!
//! Provides a TOML-based config file at `~/.config/stride/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stride_core::template::{DEFAULT_WEEKS_AHEAD, MAX_WEEKS_AHEAD};
use stride_db::config::DbConfig;

/// Environment variable overriding the default generation horizon.
pub const WEEKS_AHEAD_ENV: &str = "STRIDE_WEEKS_AHEAD";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid weeks_ahead {0:?}: expected a whole number of weeks between 1 and {MAX_WEEKS_AHEAD}")]
    InvalidWeeksAhead(String),
}

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub schedule: ScheduleSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScheduleSection {
    /// How many weeks `template generate` looks ahead when not told.
    #[serde(default = "default_weeks_ahead")]
    pub weeks_ahead: u32,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            weeks_ahead: DEFAULT_WEEKS_AHEAD,
        }
    }
}

fn default_weeks_ahead() -> u32 {
    DEFAULT_WEEKS_AHEAD
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the stride config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/stride` or `~/.config/stride`,
/// including on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("stride");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("stride")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// The file is readable by its owner only, since the URL may carry a
/// password.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

/// Parse a weeks-ahead value from the environment or a flag.
pub fn parse_weeks_ahead(raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|w| (1..=MAX_WEEKS_AHEAD).contains(w))
        .ok_or_else(|| ConfigError::InvalidWeeksAhead(raw.to_string()))
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct StrideConfig {
    pub db_config: DbConfig,
    pub weeks_ahead: u32,
}

impl StrideConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `STRIDE_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Weeks ahead: `STRIDE_WEEKS_AHEAD` > `schedule.weeks_ahead` > 4
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(DbConfig::ENV_VAR) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };

        let weeks_ahead = if let Ok(raw) = std::env::var(WEEKS_AHEAD_ENV) {
            parse_weeks_ahead(&raw)?
        } else if let Some(ref cfg) = file_config {
            parse_weeks_ahead(&cfg.schedule.weeks_ahead.to_string())
                .context("invalid [schedule] weeks_ahead in config file")?
        } else {
            DEFAULT_WEEKS_AHEAD
        };

        Ok(Self {
            db_config: DbConfig::new(db_url),
            weeks_ahead,
        })
    }
}
