//! Error types for pdpi-core
//!
//! Centralized error handling using `thiserror` for ergonomic error definitions.
//! The supervisor reuses these variants so callers match on one error type.

use thiserror::Error;

/// Main error type for strategy loading and supervision
#[derive(Error, Debug)]
pub enum Error {
    /// Strategy file is malformed or incomplete
    #[error("Strategy file '{path}' skipped: {message}")]
    ConfigParse {
        /// Path of the offending file
        path: String,
        /// What was missing or wrong
        message: String,
    },

    /// Strategies directory could not be read
    #[error("Cannot read strategies directory '{path}': {message}")]
    StrategiesDir {
        /// Directory that was scanned
        path: String,
        /// Underlying failure
        message: String,
    },

    /// Strategy index outside the catalog
    #[error("Invalid strategy index {index} (catalog has {len} entries)")]
    InvalidIndex {
        /// Requested index
        index: usize,
        /// Catalog length at the time of the request
        len: usize,
    },

    /// Resolved executable does not exist on disk
    #[error("Executable not found: {path}")]
    ExecutableNotFound {
        /// Resolved executable path
        path: String,
    },

    /// The OS refused to create the strategy process
    #[error("Failed to spawn '{executable}': {message}")]
    ProcessSpawn {
        /// Executable that was launched
        executable: String,
        /// OS error text
        message: String,
    },

    /// The supervisor has already been shut down
    #[error("Supervisor has been shut down")]
    ShutDown,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path to the missing config file
        path: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    ConfigValue {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a strategy file parse error
    pub fn config_parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a config value error
    pub fn config_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a spawn error from an I/O failure
    pub fn process_spawn(executable: impl Into<String>, err: &std::io::Error) -> Self {
        Self::ProcessSpawn {
            executable: executable.into(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidIndex { index: 4, len: 2 };
        assert!(err.to_string().contains('4'));
        assert!(err.to_string().contains('2'));

        let err = Error::config_parse("general.ini", "missing args");
        assert!(err.to_string().contains("general.ini"));
        assert!(err.to_string().contains("missing args"));
    }

    #[test]
    fn test_process_spawn_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        match Error::process_spawn("winws.exe", &io) {
            Error::ProcessSpawn { executable, message } => {
                assert_eq!(executable, "winws.exe");
                assert!(message.contains("access denied"));
            }
            _ => panic!("Wrong error type"),
        }
    }
}
