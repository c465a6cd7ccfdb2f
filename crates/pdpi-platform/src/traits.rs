//! Platform-agnostic traits for process supervision
//!
//! The supervisor only talks to these traits; the tokio/OS implementations
//! live in [`crate::process`] and [`crate::cleaner`], and tests substitute
//! their own.

use crate::cleaner::CleanupReport;
use crate::process::LaunchRequest;
use crate::Result;
use async_trait::async_trait;

/// Removes leftovers of previous runs before a start and after a stop
///
/// Implementations must never fail: every problem goes into the report.
#[async_trait]
pub trait Cleaner: Send + Sync {
    /// Terminate stray tool processes and remove driver services
    async fn clean(&self) -> CleanupReport;
}

/// Spawns the strategy executable
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Start one process described by `request`
    async fn launch(&self, request: &LaunchRequest) -> Result<Box<dyn SupervisedProcess>>;
}

/// A process owned by the supervisor
#[async_trait]
pub trait SupervisedProcess: Send {
    /// OS process id, if still known
    fn id(&self) -> Option<u32>;

    /// Whether the process has terminated
    ///
    /// An error means the state could not be determined.
    fn has_exited(&mut self) -> Result<bool>;

    /// Terminate the process and wait briefly for it to go away
    ///
    /// Killing a process that already exited is not an error.
    async fn kill(&mut self) -> Result<()>;
}
