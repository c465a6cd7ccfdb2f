//! Platform-specific errors

use thiserror::Error;

/// Platform-specific errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// A program could not be started
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        /// Program that was executed
        program: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// An operation did not finish in time
    #[error("{operation} timed out after {millis} ms")]
    Timeout {
        /// What was being waited for
        operation: String,
        /// Time allowed
        millis: u128,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Platform result type
pub type Result<T> = std::result::Result<T, PlatformError>;

impl PlatformError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, limit: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            millis: limit.as_millis(),
        }
    }
}
