//! List command - show the strategy catalog

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use pdpi_core::cmdline::quote_arguments;
use pdpi_core::{PathResolver, StrategyCatalog};
use serde::Serialize;

use crate::args::Args as GlobalArgs;
use crate::settings::LoadedSettings;

/// List command arguments
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print the catalog as JSON
    #[arg(long)]
    pub json: bool,
}

/// One catalog row with placeholders expanded
#[derive(Debug, Serialize)]
struct Entry {
    index: usize,
    name: String,
    executable: String,
    args: String,
    default: bool,
}

/// Execute list command
pub fn execute(args: &ListArgs, global: &GlobalArgs, loaded: &LoadedSettings) -> Result<()> {
    let layout = loaded.layout(global);
    let catalog = StrategyCatalog::load(layout.strategies_dir())
        .with_context(|| format!("Failed to load strategies from {}", layout.strategies_dir().display()))?;
    let resolver = PathResolver::new(&layout);
    let default = catalog.clamp_index(loaded.settings.supervisor.default_strategy);

    let entries: Vec<Entry> = catalog
        .iter()
        .enumerate()
        .map(|(index, profile)| Entry {
            index,
            name: profile.name.clone(),
            executable: resolver.resolve(&profile.executable),
            args: quote_arguments(&resolver.resolve(&profile.args)),
            default: index == default,
        })
        .collect();

    if args.json {
        let json = serde_json::to_string_pretty(&entries).context("Failed to serialize catalog")?;
        println!("{json}");
        return Ok(());
    }

    if entries.is_empty() {
        println!("No strategies found in {}", layout.strategies_dir().display());
        return Ok(());
    }

    for entry in &entries {
        let marker = if entry.default { "*".green().bold() } else { " ".normal() };
        println!("{marker} {:>3}  {}", entry.index, entry.name.bold());
        println!("        {}", entry.executable.dimmed());
        println!("        {}", entry.args.dimmed());
    }
    println!();
    println!("{} strategies, * = default", entries.len());

    Ok(())
}
