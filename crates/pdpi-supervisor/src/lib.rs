//! Penguin DPI Supervisor
//!
//! Launches, monitors and tears down the strategy executable.
//!
//! ## Lifecycle
//!
//! - `start(index)` always runs the cleaner, then spawns the resolved
//!   strategy and starts a health monitor
//! - the monitor restarts the same strategy when the process exits on its own
//! - `stop()` kills the process, cleans up and ends the monitor
//!
//! ## Example
//!
//! ```rust,no_run
//! use pdpi_core::{InstallLayout, Settings};
//! use pdpi_supervisor::ProcessSupervisor;
//!
//! # async fn example() -> pdpi_core::Result<()> {
//! let supervisor = ProcessSupervisor::from_settings(&Settings::default(), InstallLayout::discover());
//! let mut events = supervisor.subscribe();
//! supervisor.start(supervisor.current_index()).await?;
//! if let Ok(event) = events.recv().await {
//!     println!("{event}");
//! }
//! supervisor.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod event;
mod monitor;
pub mod state;
pub mod supervisor;

pub use event::SupervisorEvent;
pub use state::RunStatus;
pub use supervisor::{ProcessSupervisor, SupervisorOptions, DEFAULT_MONITOR_INTERVAL};
