//! Penguin DPI Platform Layer
//!
//! OS-facing operations used by the supervisor: spawning the strategy
//! process, terminating stray instances and removing driver services.
//!
//! ## Supported Platforms
//!
//! - **Windows**: `taskkill`/`tasklist`, `net stop`, `sc delete`
//! - **Unix**: `pkill`/`pgrep` for process cleanup (no driver services)

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
pub use error::{PlatformError, Result};

pub mod cleaner;
pub mod command;
pub mod process;

// Seams the supervisor is written against
mod traits;
pub use traits::{Cleaner, Launcher, SupervisedProcess};

pub use cleaner::{CleanupReport, ServiceCleaner};
pub use process::{LaunchRequest, ProcessLauncher};
