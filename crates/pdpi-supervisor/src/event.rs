//! Notifications emitted by the supervisor

use std::fmt;

/// Something the user should be told about
///
/// Events are broadcast in the order they happen; a presenter renders them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// A strategy process was started
    Started {
        /// Catalog index
        index: usize,
        /// Strategy name
        name: String,
    },
    /// The strategy process was stopped
    Stopped,
    /// The strategy process exited on its own and is being restarted
    TerminatedUnexpectedly {
        /// Catalog index
        index: usize,
        /// Strategy name
        name: String,
    },
    /// A start failed
    Error {
        /// Error text
        message: String,
    },
    /// A different strategy was selected
    Selected {
        /// Catalog index
        index: usize,
        /// Strategy name
        name: String,
    },
}

impl SupervisorEvent {
    /// Short notification title
    pub fn title(&self) -> &'static str {
        match self {
            SupervisorEvent::Started { .. } => "Strategy started",
            SupervisorEvent::Stopped => "Strategy stopped",
            SupervisorEvent::TerminatedUnexpectedly { .. } => "Process terminated",
            SupervisorEvent::Error { .. } => "Error",
            SupervisorEvent::Selected { .. } => "Strategy selected",
        }
    }

    /// Whether this event reports a failure
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            SupervisorEvent::Error { .. } | SupervisorEvent::TerminatedUnexpectedly { .. }
        )
    }
}

impl fmt::Display for SupervisorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorEvent::Started { index, name } => write!(f, "Started '{name}' (#{index})"),
            SupervisorEvent::Stopped => f.write_str("Stopped"),
            SupervisorEvent::TerminatedUnexpectedly { index, name } => {
                write!(f, "'{name}' (#{index}) exited unexpectedly, restarting")
            }
            SupervisorEvent::Error { message } => f.write_str(message),
            SupervisorEvent::Selected { index, name } => write!(f, "Selected '{name}' (#{index})"),
        }
    }
}
