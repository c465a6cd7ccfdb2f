//! CLI commands

pub mod clean;
pub mod completions;
pub mod config;
pub mod list;
pub mod run;

use clap::Subcommand;

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the available strategies
    List(list::ListArgs),

    /// Run a strategy under supervision until Ctrl+C
    Run(run::RunArgs),

    /// Terminate stray winws processes and remove driver services
    Clean,

    /// Configuration management
    Config(config::ConfigArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}
