//! Supervisor lifecycle state

use pdpi_platform::SupervisedProcess;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Lifecycle status of the supervisor
///
/// `Idle → Starting → Running → Stopping → Idle`; a failed start goes
/// from `Starting` straight back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    /// No strategy process is owned
    #[default]
    Idle,
    /// A start is in progress
    Starting,
    /// A strategy process is running and monitored
    Running,
    /// A stop is in progress
    Stopping,
}

impl RunStatus {
    /// Human readable status
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "Stopped",
            RunStatus::Starting => "Starting...",
            RunStatus::Running => "Running",
            RunStatus::Stopping => "Stopping...",
        }
    }

    /// Whether a strategy is running or about to run
    pub fn is_running(&self) -> bool {
        matches!(self, RunStatus::Running | RunStatus::Starting)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything guarded by the supervisor lock
#[derive(Default)]
pub(crate) struct RunState {
    pub(crate) status: RunStatus,
    /// Owned strategy processes; non-empty only while `Running`
    pub(crate) processes: Vec<Box<dyn SupervisedProcess>>,
    /// Index of the strategy the owned processes belong to
    pub(crate) running: Option<usize>,
    /// Cancels the monitor of the current run
    pub(crate) monitor: Option<CancellationToken>,
    pub(crate) shut_down: bool,
}
