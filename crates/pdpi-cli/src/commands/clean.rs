//! Clean command - one cleanup pass without starting anything

use anyhow::{Context, Result};
use colored::Colorize;
use pdpi_platform::{Cleaner, CleanupReport, ServiceCleaner};

use crate::settings::LoadedSettings;

/// Execute clean command
pub fn execute(loaded: &LoadedSettings) -> Result<()> {
    let cleaner = ServiceCleaner::from_config(&loaded.settings.supervisor);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;

    let report = runtime.block_on(cleaner.clean());
    print_report(&cleaner, &report);
    Ok(())
}

fn print_report(cleaner: &ServiceCleaner, report: &CleanupReport) {
    match report.processes_found {
        0 => println!("No running '{}' processes", cleaner.process_name()),
        found if report.processes_terminated => {
            println!("{} Terminated {found} '{}' process(es)", "✓".green(), cleaner.process_name());
        }
        found => println!(
            "{} Found {found} '{}' process(es), not all terminated",
            "!".yellow(),
            cleaner.process_name()
        ),
    }

    for service in cleaner.services() {
        if report.services_removed.contains(service) {
            println!("{} Removed service {service}", "✓".green());
        } else {
            println!("  Service {service} not removed (not installed or no service manager)");
        }
    }

    for failure in &report.failures {
        println!("{} {failure}", "✗".red());
    }
}
