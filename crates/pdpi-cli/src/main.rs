//! Penguin DPI CLI
//!
//! Command-line front end for the strategy process supervisor.

mod args;
mod commands;
mod instance;
mod logging;
mod presenter;
mod settings;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use args::Args;
use commands::Command;

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Settings may configure logging, so look them up first
    let loaded = settings::load(&args);
    let logging_config = loaded
        .as_ref()
        .map(|l| l.settings.logging.clone())
        .unwrap_or_default();
    let _log_guard = logging::init(&args, &logging_config)?;

    let result = run(&args, loaded);

    if let Err(ref e) = result {
        error!("Fatal error: {:#}", e);
    }

    result
}

fn run(args: &Args, loaded: Result<settings::LoadedSettings>) -> Result<()> {
    match &args.command {
        Command::List(list_args) => commands::list::execute(list_args, args, &loaded?),
        Command::Run(run_args) => {
            let loaded = loaded?;
            if !args.quiet {
                print_banner();
            }
            commands::run::execute(run_args, args, &loaded)
        }
        Command::Clean => commands::clean::execute(&loaded?),
        Command::Config(config_args) => commands::config::execute(config_args, args, loaded),
        Command::Completions(comp_args) => commands::completions::execute(comp_args),
    }
}

fn print_banner() {
    use colored::Colorize;

    println!();
    println!("{}", "╔═══════════════════════════════════════════════════════╗".cyan());
    println!("{}", "║                                                       ║".cyan());
    let title = format!("Penguin DPI v{}", env!("CARGO_PKG_VERSION"));
    println!("{}{}{}", "║  ".cyan(), format!("{title:<53}").green().bold(), "║".cyan());
    println!("{}{}{}", "║  ".cyan(), format!("{:<53}", "winws strategy supervisor").white(), "║".cyan());
    println!("{}", "║                                                       ║".cyan());
    println!("{}", "╚═══════════════════════════════════════════════════════╝".cyan());
    println!();
}
