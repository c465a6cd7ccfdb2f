//! Configuration management for Penguin DPI
//!
//! Provides a strongly-typed settings file with TOML support. Every section
//! falls back to defaults so a partial file (or none at all) is valid.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default file name of the settings file
pub const SETTINGS_FILE_NAME: &str = "penguin-dpi.toml";

/// Main settings structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Installation layout
    pub paths: PathsConfig,

    /// Process supervision
    pub supervisor: SupervisorConfig,

    /// Event presentation
    pub notifications: NotificationsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load settings from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| Error::ConfigNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Error::from)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("paths.program_dir", &self.paths.program_dir),
            ("paths.tool_dir", &self.paths.tool_dir),
            ("paths.blacklist_dir", &self.paths.blacklist_dir),
            ("paths.strategies_dir", &self.paths.strategies_dir),
            ("paths.config_dir", &self.paths.config_dir),
        ] {
            if value.trim().is_empty() {
                return Err(Error::config_value(key, "Directory name must not be empty"));
            }
        }

        if self.supervisor.monitor_interval_secs == 0 {
            return Err(Error::config_value(
                "supervisor.monitor_interval_secs",
                "Must be greater than zero",
            ));
        }

        if self.supervisor.cleanup_timeout_secs == 0 {
            return Err(Error::config_value(
                "supervisor.cleanup_timeout_secs",
                "Must be greater than zero",
            ));
        }

        let name = self.supervisor.process_name.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(Error::config_value(
                "supervisor.process_name",
                "Must be a bare executable name",
            ));
        }

        if self.supervisor.driver_services.iter().any(|s| s.trim().is_empty()) {
            return Err(Error::config_value(
                "supervisor.driver_services",
                "Service names must not be empty",
            ));
        }

        Ok(())
    }
}

/// Directory names of the installation layout, relative to the root
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Installation root (None = directory of the executable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    /// Program directory under the root
    pub program_dir: String,
    /// Tool directory under the program directory
    pub tool_dir: String,
    /// Blacklist directory under the program directory
    pub blacklist_dir: String,
    /// Strategies directory under the program directory
    pub strategies_dir: String,
    /// Bundled configuration directory under the program directory
    pub config_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: None,
            program_dir: "Program".to_string(),
            tool_dir: "Zapret".to_string(),
            blacklist_dir: "Blacklist".to_string(),
            strategies_dir: "Strateg".to_string(),
            config_dir: "Config".to_string(),
        }
    }
}

/// Process supervision settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Health check interval in seconds
    pub monitor_interval_secs: u64,
    /// Upper bound for terminating stray processes, in seconds
    pub cleanup_timeout_secs: u64,
    /// Executable name of the packet filter, without extension
    pub process_name: String,
    /// Driver services stopped and deleted before every start
    pub driver_services: Vec<String>,
    /// Strategy selected at startup
    pub default_strategy: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            monitor_interval_secs: 120,
            cleanup_timeout_secs: 5,
            process_name: "winws".to_string(),
            driver_services: vec!["WinDivert".to_string(), "WinDivert14".to_string()],
            default_strategy: 0,
        }
    }
}

impl SupervisorConfig {
    /// Health check interval
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    /// Bound on stray process termination
    pub fn cleanup_timeout(&self) -> Duration {
        Duration::from_secs(self.cleanup_timeout_secs)
    }
}

/// Event presentation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Show supervisor events to the user
    pub enabled: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log file path (None = stdout only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Enable JSON format logging
    pub json_format: bool,
    /// Log lines written by the strategy process
    pub capture_child_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            json_format: false,
            capture_child_output: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.paths.program_dir, "Program");
        assert_eq!(settings.paths.tool_dir, "Zapret");
        assert_eq!(settings.supervisor.monitor_interval(), Duration::from_secs(120));
        assert_eq!(settings.supervisor.cleanup_timeout(), Duration::from_secs(5));
        assert_eq!(settings.supervisor.process_name, "winws");
        assert_eq!(settings.supervisor.driver_services, vec!["WinDivert", "WinDivert14"]);
        assert!(settings.notifications.enabled);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_interval() {
        let mut settings = Settings::default();
        settings.supervisor.monitor_interval_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_process_name() {
        let mut settings = Settings::default();
        settings.supervisor.process_name = "C:\\tools\\winws".to_string();
        assert!(settings.validate().is_err());

        settings.supervisor.process_name = "  ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_empty_dir_name() {
        let mut settings = Settings::default();
        settings.paths.strategies_dir = String::new();
        match settings.validate() {
            Err(Error::ConfigValue { key, .. }) => assert_eq!(key, "paths.strategies_dir"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_validation_empty_service() {
        let mut settings = Settings::default();
        settings.supervisor.driver_services.push(String::new());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_toml_parse_partial() {
        let content = r#"
[supervisor]
monitor_interval_secs = 30
default_strategy = 2

[notifications]
enabled = false
"#;
        let settings = Settings::from_toml(content).unwrap();
        assert_eq!(settings.supervisor.monitor_interval_secs, 30);
        assert_eq!(settings.supervisor.default_strategy, 2);
        assert_eq!(settings.supervisor.cleanup_timeout_secs, 5);
        assert!(!settings.notifications.enabled);
        assert_eq!(settings.paths.strategies_dir, "Strateg");
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut settings = Settings::default();
        settings.paths.root = Some("D:\\Penguin".to_string());
        settings.logging.json_format = true;

        let toml = settings.to_toml().unwrap();
        let parsed = Settings::from_toml(&toml).unwrap();
        assert_eq!(parsed.paths.root.as_deref(), Some("D:\\Penguin"));
        assert!(parsed.logging.json_format);
        assert_eq!(parsed.supervisor.driver_services, settings.supervisor.driver_services);
    }

    #[test]
    fn test_toml_parse_invalid() {
        assert!(Settings::from_toml("this is not [valid toml").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        match Settings::load("/definitely/not/here/penguin-dpi.toml") {
            Err(Error::ConfigNotFound { path }) => assert!(path.ends_with("penguin-dpi.toml")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
