//! Config command - configuration management

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use pdpi_core::{PathResolver, Settings};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::args::Args as GlobalArgs;
use crate::settings::{self, LoadedSettings};

/// Config command arguments
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Settings file to show (default: detect)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Generate a settings file with all defaults
    Generate {
        /// Output file path
        #[arg(short, long, default_value = pdpi_core::config::SETTINGS_FILE_NAME)]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a settings file
    Validate {
        /// Settings file to validate (default: detect)
        file: Option<PathBuf>,
    },

    /// Show settings file search paths and installation directories
    Paths,
}

/// Execute config command
///
/// `loaded` is the result of the startup settings lookup; only the actions
/// that need it report its error.
pub fn execute(args: &ConfigArgs, global: &GlobalArgs, loaded: Result<LoadedSettings>) -> Result<()> {
    match &args.action {
        ConfigAction::Show { file } => {
            let loaded = match file {
                Some(path) => settings::load_file(path)?,
                None => loaded?,
            };
            show_config(&loaded)
        }
        ConfigAction::Generate { output, force } => generate_config(output, *force),
        ConfigAction::Validate { file } => validate_config(file.clone(), global),
        ConfigAction::Paths => show_paths(global, &loaded?),
    }
}

fn show_config(loaded: &LoadedSettings) -> Result<()> {
    match &loaded.source {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => println!("# No settings file found, showing defaults"),
    }
    println!("{}", loaded.settings.to_toml().context("Failed to serialize settings")?);
    Ok(())
}

fn generate_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", output.display());
    }

    let toml_str = Settings::default()
        .to_toml()
        .context("Failed to serialize settings")?;
    let content = format!(
        "# Penguin DPI settings\n\
         # Every key is optional; missing keys use the values shown here.\n\n\
         {toml_str}"
    );

    std::fs::write(output, content)
        .with_context(|| format!("Failed to write settings to {}", output.display()))?;

    info!(path = %output.display(), "Generated settings file");
    println!("Settings file generated: {}", output.display());
    Ok(())
}

fn validate_config(file: Option<PathBuf>, global: &GlobalArgs) -> Result<()> {
    let Some(path) = file.or_else(|| settings::find_config_file(global)) else {
        bail!("No settings file found; pass a path or use --config");
    };
    let loaded = settings::load_file(&path)?;
    let settings = &loaded.settings;

    println!("{} Settings are valid", "✓".green());
    println!("  File: {}", path.display());
    println!("  Monitor interval: {}s", settings.supervisor.monitor_interval_secs);
    println!("  Process name: {}", settings.supervisor.process_name);
    println!("  Driver services: {}", settings.supervisor.driver_services.join(", "));
    println!("  Notifications: {}", settings.notifications.enabled);
    Ok(())
}

fn show_paths(global: &GlobalArgs, loaded: &LoadedSettings) -> Result<()> {
    println!("Settings file search paths:");
    println!();
    let mut n = 1;
    if let Some(path) = &global.config {
        println!("  {n}. {} (--config)", path.display());
        n += 1;
    }
    for path in settings::search_paths(global) {
        let marker = if loaded.source.as_ref() == Some(&path) { " (in use)" } else { "" };
        println!("  {n}. {}{marker}", path.display());
        n += 1;
    }

    let layout = loaded.layout(global);
    println!();
    println!("Installation directories:");
    println!();
    println!("  Root:        {}", layout.root().display());
    println!("  Tool:        {}", layout.tool_dir().display());
    println!("  Blacklists:  {}", layout.blacklist_dir().display());
    println!("  Strategies:  {}", layout.strategies_dir().display());

    println!();
    println!("Strategy placeholders:");
    println!();
    for (token, value) in PathResolver::new(&layout).replacements() {
        println!("  {token:<12} {value}");
    }
    Ok(())
}
