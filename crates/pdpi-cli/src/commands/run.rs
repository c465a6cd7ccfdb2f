//! Run command - supervise one strategy until interrupted

use anyhow::{bail, Context, Result};
use clap::Args;
use pdpi_core::StrategyCatalog;
use pdpi_supervisor::{ProcessSupervisor, SupervisorOptions};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::args::Args as GlobalArgs;
use crate::instance::InstanceLock;
use crate::presenter;
use crate::settings::LoadedSettings;

/// How long the presenter may take to print the last events
const PRESENTER_DRAIN: Duration = Duration::from_secs(1);

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Strategy index (default: `supervisor.default_strategy`)
    pub index: Option<usize>,

    /// Select the strategy by name instead of index
    #[arg(short, long, conflicts_with = "index")]
    pub name: Option<String>,
}

/// Execute the run command
pub fn execute(args: &RunArgs, global: &GlobalArgs, loaded: &LoadedSettings) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;
    runtime.block_on(run(args, global, loaded))
}

async fn run(args: &RunArgs, global: &GlobalArgs, loaded: &LoadedSettings) -> Result<()> {
    let layout = loaded.layout(global);
    info!(root = %layout.root().display(), "Starting Penguin DPI");

    let _lock = InstanceLock::acquire(layout.config_dir())?;

    let strategies = layout.strategies_dir().to_path_buf();
    let catalog = tokio::task::spawn_blocking({
        let dir = strategies.clone();
        move || StrategyCatalog::load(dir)
    })
    .await
    .context("Strategy loader panicked")?
    .context("Failed to load strategies")?;
    if catalog.is_empty() {
        bail!("No strategies found in {}", strategies.display());
    }

    let supervisor = ProcessSupervisor::new(
        SupervisorOptions::from_settings(&loaded.settings, layout).with_catalog(catalog),
    );

    let index = match (&args.name, args.index) {
        (Some(name), _) => supervisor
            .catalog()
            .position(name)
            .with_context(|| format!("Unknown strategy: {name}"))?,
        (None, Some(index)) => index,
        (None, None) => supervisor.current_index(),
    };

    let presenter = presenter::spawn(
        supervisor.subscribe(),
        loaded.settings.notifications.enabled,
    );

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Received interrupt signal, shutting down...");
        token.cancel();
    })
    .context("Failed to set signal handler")?;

    if index != supervisor.current_index() {
        supervisor.set_current_index(index).await?;
    }

    let started = supervisor.start(index).await;
    if started.is_ok() {
        info!("Press Ctrl+C to stop");
        shutdown.cancelled().await;
    }

    supervisor.shutdown().await;
    drop(supervisor);
    let _ = tokio::time::timeout(PRESENTER_DRAIN, presenter).await;

    started.context("Failed to start strategy")?;
    info!("Penguin DPI stopped");
    Ok(())
}
