//! Configuration management for reviewer-tools.
//!
//! Handles loading and saving configuration from TOML files.
//! Config files are stored in platform-specific locations:
//!
//! - **macOS/Linux**: `~/.config/reviewer-tools/config.toml`
//! - **Windows**: `%APPDATA%\reviewer-tools\config.toml`
//!
//! The `REVIEWER_CONFIG` environment variable overrides the location.
//!
//! # Example
//!
//! ```toml
//! review_days = 15
//! auto_detect_members = true
//!
//! [logs]
//! level = "info"
//! enable_file_logs = true
//!
//! [[teams]]
//! name = "platform"
//! org = "acme"
//! team_slug = "platform"
//! repositories = ["acme/api", "acme/web-*"]
//!
//! [[teams.members]]
//! name = "Ana"
//! email = "ana@acme.io"
//! github = "ana-dev"
//! workload_factor = 0.5
//! ```

use crate::types::TeamConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config directory name.
const CONFIG_DIR_NAME: &str = "reviewer-tools";

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "REVIEWER_CONFIG";

/// Directory under the config directory holding log files.
const LOG_DIR_NAME: &str = "logs";

/// Lookback window used when neither the caller nor the config sets one.
pub const DEFAULT_REVIEW_DAYS: u32 = 15;

// =============================================================================
// Configuration structures
// =============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Days of review history considered when scoring
    #[serde(default = "default_review_days", alias = "reviewDays")]
    pub review_days: u32,

    /// Merge live GitHub team membership into the configured teams
    #[serde(default, alias = "auto_detect_members_from_github")]
    pub auto_detect_members: bool,

    /// GitHub connection settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GitHubConfig>,

    /// Logging settings
    #[serde(default)]
    pub logs: LogConfig,

    /// Configured teams, matched in order
    #[serde(default)]
    pub teams: Vec<TeamConfig>,
}

/// GitHub connection configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API base URL (for GitHub Enterprise)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Token passed through to the API as-is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default level filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write logs to a file in `log_dir`
    #[serde(default = "default_enable_file_logs")]
    pub enable_file_logs: bool,

    /// Log file directory (default: `<config_dir>/reviewer-tools/logs`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            enable_file_logs: default_enable_file_logs(),
            log_dir: None,
        }
    }
}

impl LogConfig {
    /// Directory log files are written to.
    pub fn resolved_log_dir(&self) -> Result<PathBuf> {
        match &self.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Config::config_dir()?.join(LOG_DIR_NAME)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            review_days: DEFAULT_REVIEW_DAYS,
            auto_detect_members: false,
            github: None,
            logs: LogConfig::default(),
            teams: Vec::new(),
        }
    }
}

fn default_review_days() -> u32 {
    DEFAULT_REVIEW_DAYS
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_enable_file_logs() -> bool {
    true
}

// =============================================================================
// Config implementation
// =============================================================================

impl Config {
    /// Get the configuration directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the configuration file path, honoring `REVIEWER_CONFIG`.
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// A missing file is an error: there is nothing to assign without teams.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        debug!(path = ?path, "Loading config");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        info!(path = ?path, teams = config.teams.len(), "Config loaded successfully");
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        debug!(path = ?path, "Saving config");

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        info!(path = ?path, "Config saved successfully");
        Ok(())
    }

    /// Set a scalar configuration value by key.
    ///
    /// Keys: `review_days`, `auto_detect_members`, `github.base_url`,
    /// `github.token`, `logs.level`, `logs.enable_file_logs`, `logs.log_dir`.
    /// Teams are edited in the file directly.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "review_days" => {
                self.review_days = value
                    .parse::<u32>()
                    .ok()
                    .filter(|days| *days > 0)
                    .ok_or_else(|| {
                        Error::Config(format!(
                            "review_days must be a positive integer, got '{}'",
                            value
                        ))
                    })?;
            }
            "auto_detect_members" => {
                self.auto_detect_members = value.parse().map_err(|_| {
                    Error::Config(format!(
                        "auto_detect_members must be true or false, got '{}'",
                        value
                    ))
                })?;
            }
            "github.base_url" | "github.url" => {
                self.github.get_or_insert_with(GitHubConfig::default).base_url =
                    Some(value.to_string());
            }
            "github.token" => {
                self.github.get_or_insert_with(GitHubConfig::default).token =
                    Some(value.to_string());
            }
            "logs.level" => self.logs.level = value.to_string(),
            "logs.enable_file_logs" => {
                self.logs.enable_file_logs = value.parse().map_err(|_| {
                    Error::Config(format!(
                        "logs.enable_file_logs must be true or false, got '{}'",
                        value
                    ))
                })?;
            }
            "logs.log_dir" => {
                self.logs.log_dir = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            _ => return Err(Error::Config(format!("Unknown config key: {}", key))),
        }

        Ok(())
    }

    /// Get a scalar configuration value by key.
    ///
    /// Returns `Ok(None)` for optional values that are not set.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        match key {
            "review_days" => Ok(Some(self.review_days.to_string())),
            "auto_detect_members" => Ok(Some(self.auto_detect_members.to_string())),
            "github.base_url" | "github.url" => {
                Ok(self.github.as_ref().and_then(|g| g.base_url.clone()))
            }
            "github.token" => Ok(self.github.as_ref().and_then(|g| g.token.clone())),
            "logs.level" => Ok(Some(self.logs.level.clone())),
            "logs.enable_file_logs" => Ok(Some(self.logs.enable_file_logs.to_string())),
            "logs.log_dir" => Ok(self
                .logs
                .log_dir
                .as_ref()
                .map(|dir| dir.display().to_string())),
            _ => Err(Error::Config(format!("Unknown config key: {}", key))),
        }
    }
}

// =============================================================================
// Config source
// =============================================================================

/// Where tools read their configuration from on each invocation.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Re-read the TOML file every time
    File(PathBuf),
    /// Fixed in-memory configuration
    Fixed(Config),
}

impl ConfigSource {
    /// Source backed by the default config path.
    pub fn default_file() -> Result<Self> {
        Ok(Self::File(Config::config_path()?))
    }

    /// Load the current configuration.
    pub fn load(&self) -> Result<Config> {
        match self {
            Self::File(path) => Config::load_from(path),
            Self::Fixed(config) => Ok(config.clone()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TeamMember;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
review_days = 10
auto_detect_members = true

[github]
base_url = "https://github.example.com/api/v3"

[[teams]]
name = "platform"
org = "acme"
team_slug = "platform"
repositories = ["acme/api", "acme/web-*"]
webhook_url = "https://chat.example.com/v1/spaces/X/messages?key=k"
exclude_members = ["release-bot"]

[[teams.members]]
name = "Ana"
email = "ana@acme.io"
github = "ana-dev"
workload_factor = 0.5

[[teams.members]]
name = "Bob"
email = "bob@acme.io"
github = "bob"
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.review_days, DEFAULT_REVIEW_DAYS);
        assert!(!config.auto_detect_members);
        assert!(config.teams.is_empty());
        assert_eq!(config.logs.level, "info");
        assert!(config.logs.enable_file_logs);
        assert!(config.logs.log_dir.is_none());
    }

    #[test]
    fn test_parse_sample() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.review_days, 10);
        assert!(config.auto_detect_members);
        assert_eq!(config.teams.len(), 1);

        let team = &config.teams[0];
        assert_eq!(team.directory_key(), Some(("acme", "platform")));
        assert_eq!(team.exclude_members, vec!["release-bot"]);
        assert_eq!(team.members[0].github_login, "ana-dev");
        assert_eq!(team.members[0].workload_factor, Some(0.5));
        assert_eq!(team.members[1].workload_factor, None);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = toml::from_str("[[teams]]\nname = \"solo\"\n").unwrap();
        assert_eq!(config.review_days, DEFAULT_REVIEW_DAYS);
        assert!(config.teams[0].members.is_empty());
        assert!(config.teams[0].repositories.is_empty());
    }

    #[test]
    fn test_load_nonexistent_is_error() {
        let path = PathBuf::from("/nonexistent/path/config.toml");
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "teams = [ not toml").unwrap();
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_save_and_load() {
        let mut config = Config::default();
        config.teams.push(TeamConfig {
            name: "core".to_string(),
            members: vec![TeamMember::new("Ana", "ana@acme.io", "ana").with_workload_factor(0.5)],
            repositories: vec!["acme/core".to_string()],
            ..Default::default()
        });

        let file = NamedTempFile::new().unwrap();
        config.save_to(file.path()).unwrap();

        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert!(contents.contains("github = \"ana\""));

        let loaded = Config::load_from(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_set_and_get() {
        let mut config = Config::default();

        config.set("review_days", "30").unwrap();
        config.set("auto_detect_members", "true").unwrap();
        config.set("github.token", "ghp_x").unwrap();
        config.set("logs.level", "debug").unwrap();

        assert_eq!(config.get("review_days").unwrap(), Some("30".to_string()));
        assert_eq!(
            config.get("auto_detect_members").unwrap(),
            Some("true".to_string())
        );
        assert_eq!(config.get("github.token").unwrap(), Some("ghp_x".to_string()));
        assert_eq!(config.get("github.base_url").unwrap(), None);
        assert_eq!(config.get("logs.level").unwrap(), Some("debug".to_string()));
    }

    #[test]
    fn test_log_settings_round_trip() {
        let mut config = Config::default();
        config.set("logs.enable_file_logs", "false").unwrap();
        config.set("logs.log_dir", "/var/log/reviewer").unwrap();

        assert_eq!(
            config.get("logs.enable_file_logs").unwrap(),
            Some("false".to_string())
        );
        assert_eq!(
            config.get("logs.log_dir").unwrap(),
            Some("/var/log/reviewer".to_string())
        );
        assert!(config.set("logs.enable_file_logs", "sometimes").is_err());

        let file = NamedTempFile::new().unwrap();
        config.save_to(file.path()).unwrap();
        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert!(contents.contains("enable_file_logs = false"));

        let loaded = Config::load_from(file.path()).unwrap();
        assert!(!loaded.logs.enable_file_logs);
        assert_eq!(
            loaded.logs.resolved_log_dir().unwrap(),
            PathBuf::from("/var/log/reviewer")
        );

        config.set("logs.log_dir", "").unwrap();
        assert_eq!(config.get("logs.log_dir").unwrap(), None);
    }

    #[test]
    fn test_log_settings_from_toml() {
        let contents = r#"
[logs]
level = "debug"
log_dir = "/tmp/reviewer-logs"
"#;
        let config: Config = toml::from_str(contents).unwrap();
        assert_eq!(config.logs.level, "debug");
        assert!(config.logs.enable_file_logs);
        assert_eq!(config.logs.log_dir, Some(PathBuf::from("/tmp/reviewer-logs")));
    }

    #[test]
    fn test_invalid_key_and_value() {
        let mut config = Config::default();
        assert!(config.set("unknown", "x").is_err());
        assert!(config.set("review_days", "soon").is_err());
        assert!(config.set("review_days", "0").is_err());
        assert!(config.set("auto_detect_members", "maybe").is_err());
        assert!(config.get("teams").is_err());
    }

    #[test]
    fn test_config_source_fixed() {
        let source = ConfigSource::Fixed(Config::default());
        assert_eq!(source.load().unwrap(), Config::default());
    }

    #[test]
    fn test_config_source_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), SAMPLE).unwrap();
        let source = ConfigSource::File(file.path().to_path_buf());
        assert_eq!(source.load().unwrap().teams[0].name, "platform");
    }
}
