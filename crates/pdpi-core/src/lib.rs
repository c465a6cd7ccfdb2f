//! # Penguin DPI Core
//!
//! Platform-independent building blocks for supervising a `winws` strategy
//! process.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Strategy catalog** - Parses a directory of `.ini` strategy files
//! - **Path resolution** - Expands `{ZAPRET}` / `{BLACKLIST}` placeholders
//! - **Command lines** - Quoting rules for the arguments handed to `winws`
//! - **Configuration** - TOML settings for paths, supervision and logging
//!
//! ## Example
//!
//! ```rust,no_run
//! use pdpi_core::{InstallLayout, PathResolver, StrategyCatalog};
//!
//! let layout = InstallLayout::discover();
//! let catalog = StrategyCatalog::load(layout.strategies_dir())?;
//! let resolver = PathResolver::new(&layout);
//!
//! for profile in catalog.iter() {
//!     println!("{} -> {}", profile.name, resolver.resolve(&profile.executable));
//! }
//! # Ok::<(), pdpi_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod cmdline;
pub mod config;
pub mod error;
pub mod paths;

// Re-exports for convenience
pub use catalog::{StrategyCatalog, StrategyProfile};
pub use config::Settings;
pub use error::{Error, Result};
pub use paths::{InstallLayout, PathResolver};
