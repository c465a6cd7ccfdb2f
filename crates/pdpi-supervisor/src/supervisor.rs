//! Strategy process supervisor
//!
//! [`ProcessSupervisor`] owns at most one running strategy process. Every
//! lifecycle transition happens under one async lock; status is published
//! through a `watch` channel and notifications through a `broadcast`
//! channel, so readers never wait on the lock.

use crate::event::SupervisorEvent;
use crate::monitor;
use crate::state::{RunState, RunStatus};
use parking_lot::RwLock;
use pdpi_core::cmdline::quote_arguments;
use pdpi_core::{Error, InstallLayout, PathResolver, Result, Settings, StrategyCatalog};
use pdpi_platform::{
    Cleaner, LaunchRequest, Launcher, PlatformError, ProcessLauncher, ServiceCleaner,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default interval between health checks
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(120);

const EVENT_CAPACITY: usize = 64;

/// Construction parameters for [`ProcessSupervisor`]
pub struct SupervisorOptions {
    /// Installation directories
    pub layout: InstallLayout,
    /// Time between health checks of the running process
    pub monitor_interval: Duration,
    /// Selected strategy before anything is started
    pub initial_index: usize,
    /// Drain child output into the log
    pub capture_output: bool,
    /// Catalog to use instead of loading the strategies directory
    pub catalog: Option<StrategyCatalog>,
    /// Removes leftovers before starts and after stops
    pub cleaner: Arc<dyn Cleaner>,
    /// Spawns the strategy executable
    pub launcher: Arc<dyn Launcher>,
}

impl SupervisorOptions {
    /// Options with default interval and selection
    pub fn new(layout: InstallLayout, cleaner: Arc<dyn Cleaner>, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            layout,
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            initial_index: 0,
            capture_output: true,
            catalog: None,
            cleaner,
            launcher,
        }
    }

    /// Options from the settings file, using the OS cleaner and launcher
    pub fn from_settings(settings: &Settings, layout: InstallLayout) -> Self {
        let supervisor = &settings.supervisor;
        Self::new(
            layout,
            Arc::new(ServiceCleaner::from_config(supervisor)),
            Arc::new(ProcessLauncher::new()),
        )
        .with_monitor_interval(supervisor.monitor_interval())
        .with_initial_index(supervisor.default_strategy)
        .with_capture_output(settings.logging.capture_child_output)
    }

    /// Set the health check interval
    #[must_use]
    pub fn with_monitor_interval(mut self, interval: Duration) -> Self {
        self.monitor_interval = interval;
        self
    }

    /// Set the initially selected strategy
    #[must_use]
    pub fn with_initial_index(mut self, index: usize) -> Self {
        self.initial_index = index;
        self
    }

    /// Enable or disable child output capture
    #[must_use]
    pub fn with_capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    /// Use `catalog` instead of reading the strategies directory
    #[must_use]
    pub fn with_catalog(mut self, catalog: StrategyCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }
}

/// Supervises the strategy executable
///
/// Dropping the supervisor cancels its monitor; owned processes are killed
/// once the last reference to them goes away. Call [`shutdown`] for an
/// orderly stop with cleanup.
///
/// [`shutdown`]: ProcessSupervisor::shutdown
pub struct ProcessSupervisor {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    layout: InstallLayout,
    resolver: PathResolver,
    pub(crate) monitor_interval: Duration,
    capture_output: bool,
    cleaner: Arc<dyn Cleaner>,
    launcher: Arc<dyn Launcher>,
    catalog: RwLock<Arc<StrategyCatalog>>,
    /// Written only under `state`, read without it
    selected: AtomicUsize,
    pub(crate) state: Mutex<RunState>,
    status_tx: watch::Sender<RunStatus>,
    events: broadcast::Sender<SupervisorEvent>,
    root_token: CancellationToken,
}

impl ProcessSupervisor {
    /// Create a supervisor
    ///
    /// Unless the options carry a catalog, the strategies directory is
    /// loaded now; a failure is logged and leaves the catalog empty.
    pub fn new(options: SupervisorOptions) -> Self {
        let catalog = match options.catalog {
            Some(catalog) => catalog,
            None => StrategyCatalog::load(options.layout.strategies_dir()).unwrap_or_else(|e| {
                warn!("{e}");
                StrategyCatalog::default()
            }),
        };
        let selected = catalog.clamp_index(options.initial_index);
        if selected != options.initial_index {
            debug!(
                requested = options.initial_index,
                len = catalog.len(),
                "Initial strategy out of range, using 0"
            );
        }

        let (status_tx, _) = watch::channel(RunStatus::Idle);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                resolver: PathResolver::new(&options.layout),
                layout: options.layout,
                monitor_interval: options.monitor_interval,
                capture_output: options.capture_output,
                cleaner: options.cleaner,
                launcher: options.launcher,
                catalog: RwLock::new(catalog.into_shared()),
                selected: AtomicUsize::new(selected),
                state: Mutex::new(RunState::default()),
                status_tx,
                events,
                root_token: CancellationToken::new(),
            }),
        }
    }

    /// Create a supervisor using the OS cleaner and launcher
    pub fn from_settings(settings: &Settings, layout: InstallLayout) -> Self {
        Self::new(SupervisorOptions::from_settings(settings, layout))
    }

    /// Reload the catalog from the strategies directory
    ///
    /// The directory is read on the blocking pool. An out-of-range
    /// selection falls back to 0. Returns the number of strategies loaded.
    pub async fn load_catalog(&self) -> Result<usize> {
        let dir = self.inner.layout.strategies_dir().to_path_buf();
        let catalog = tokio::task::spawn_blocking({
            let dir = dir.clone();
            move || StrategyCatalog::load(dir)
        })
        .await
        .map_err(|e| Error::StrategiesDir {
            path: dir.display().to_string(),
            message: e.to_string(),
        })??;
        let _state = self.inner.state.lock().await;
        let len = catalog.len();
        let selected = catalog.clamp_index(self.inner.selected.load(Ordering::Acquire));
        *self.inner.catalog.write() = catalog.into_shared();
        self.inner.selected.store(selected, Ordering::Release);
        Ok(len)
    }

    /// Start the strategy at `index`
    ///
    /// Does nothing if a strategy is already running.
    pub async fn start(&self, index: usize) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        self.inner.start_locked(&mut state, index).await
    }

    /// Stop the running strategy, if any
    pub async fn stop(&self) {
        let mut state = self.inner.state.lock().await;
        self.inner.stop_locked(&mut state).await;
    }

    /// Stop when running, otherwise start the selected strategy
    pub async fn toggle(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        if state.status == RunStatus::Running {
            self.inner.stop_locked(&mut state).await;
            Ok(())
        } else {
            let index = self.inner.current_index();
            self.inner.start_locked(&mut state, index).await
        }
    }

    /// Currently selected strategy index
    pub fn current_index(&self) -> usize {
        self.inner.current_index()
    }

    /// Select a strategy without starting it
    pub async fn set_current_index(&self, index: usize) -> Result<()> {
        let _state = self.inner.state.lock().await;
        let catalog = self.catalog();
        let name = catalog.require(index)?.name.clone();
        self.inner.selected.store(index, Ordering::Release);
        self.inner.emit(SupervisorEvent::Selected { index, name });
        Ok(())
    }

    /// Current lifecycle status
    pub fn status(&self) -> RunStatus {
        *self.inner.status_tx.borrow()
    }

    /// Receiver that observes every status change
    pub fn status_receiver(&self) -> watch::Receiver<RunStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Current catalog
    pub fn catalog(&self) -> Arc<StrategyCatalog> {
        self.inner.catalog()
    }

    /// Installation directories in use
    pub fn layout(&self) -> &InstallLayout {
        &self.inner.layout
    }

    /// Receive notifications from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SupervisorEvent> {
        self.inner.events.subscribe()
    }

    /// Stop everything and refuse further starts
    ///
    /// Later calls are no-ops.
    pub async fn shutdown(&self) {
        self.inner.root_token.cancel();
        let mut state = self.inner.state.lock().await;
        if state.shut_down {
            return;
        }
        info!("Shutting down supervisor");
        self.inner.stop_locked(&mut state).await;
        state.shut_down = true;
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        self.inner.root_token.cancel();
    }
}

impl Inner {
    pub(crate) fn current_index(&self) -> usize {
        self.selected.load(Ordering::Acquire)
    }

    pub(crate) fn catalog(&self) -> Arc<StrategyCatalog> {
        Arc::clone(&self.catalog.read())
    }

    pub(crate) fn strategy_name(&self, index: usize) -> String {
        self.catalog()
            .get(index)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    pub(crate) fn emit(&self, event: SupervisorEvent) {
        if event.is_error() {
            warn!(event = %event, "{}", event.title());
        } else {
            info!(event = %event, "{}", event.title());
        }
        // No receivers is fine
        let _ = self.events.send(event);
    }

    fn set_status(&self, state: &mut RunState, status: RunStatus) {
        state.status = status;
        self.status_tx.send_replace(status);
        debug!(status = %status, "Status changed");
    }

    pub(crate) async fn start_locked(self: &Arc<Self>, state: &mut RunState, index: usize) -> Result<()> {
        if state.shut_down {
            return Err(Error::ShutDown);
        }
        if state.status == RunStatus::Running {
            debug!("Strategy already running");
            return Ok(());
        }

        self.cleaner.clean().await;

        let catalog = self.catalog();
        let profile = catalog.require(index)?;

        self.set_status(state, RunStatus::Starting);
        self.selected.store(index, Ordering::Release);

        let executable = PathBuf::from(self.resolver.resolve(&profile.executable));
        if !executable.is_file() {
            let err = Error::ExecutableNotFound {
                path: executable.display().to_string(),
            };
            self.fail_start(state, &err);
            return Err(err);
        }

        let args = quote_arguments(&self.resolver.resolve(&profile.args));
        info!(
            strategy = %profile.name,
            executable = %executable.display(),
            args = %args,
            "Starting strategy"
        );

        let request = LaunchRequest::new(&executable, args, self.layout.tool_dir())
            .with_capture_output(self.capture_output);
        match self.launcher.launch(&request).await {
            Ok(process) => {
                state.processes.push(process);
                state.running = Some(index);
                self.set_status(state, RunStatus::Running);

                let token = self.root_token.child_token();
                state.monitor = Some(token.clone());
                monitor::spawn(Arc::clone(self), token);

                self.emit(SupervisorEvent::Started {
                    index,
                    name: profile.name.clone(),
                });
                Ok(())
            }
            Err(e) => {
                let err = spawn_error(&executable, e);
                self.fail_start(state, &err);
                Err(err)
            }
        }
    }

    fn fail_start(&self, state: &mut RunState, err: &Error) {
        error!("{err}");
        self.set_status(state, RunStatus::Idle);
        self.emit(SupervisorEvent::Error {
            message: err.to_string(),
        });
    }

    pub(crate) async fn stop_locked(&self, state: &mut RunState) {
        if state.status != RunStatus::Running {
            return;
        }

        self.set_status(state, RunStatus::Stopping);
        if let Some(token) = state.monitor.take() {
            token.cancel();
        }

        state.running = None;
        for mut process in std::mem::take(&mut state.processes) {
            if process.has_exited().unwrap_or(false) {
                debug!(pid = process.id(), "Strategy process already exited");
                continue;
            }
            if let Err(e) = process.kill().await {
                warn!(pid = process.id(), error = %e, "Failed to kill strategy process");
            }
        }

        self.set_status(state, RunStatus::Idle);
        self.cleaner.clean().await;
        self.emit(SupervisorEvent::Stopped);
    }
}

fn spawn_error(executable: &Path, err: PlatformError) -> Error {
    let executable = executable.display().to_string();
    match err {
        PlatformError::Spawn { source, .. } => Error::process_spawn(executable, &source),
        other => Error::ProcessSpawn {
            executable,
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use pdpi_core::StrategyProfile;
    use pdpi_platform::{CleanupReport, SupervisedProcess};

    mock! {
        pub TestCleaner {}

        #[async_trait]
        impl Cleaner for TestCleaner {
            async fn clean(&self) -> CleanupReport;
        }
    }

    struct RefusingLauncher;

    #[async_trait]
    impl Launcher for RefusingLauncher {
        async fn launch(&self, request: &LaunchRequest) -> pdpi_platform::Result<Box<dyn SupervisedProcess>> {
            Err(PlatformError::Spawn {
                program: request.executable.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied"),
            })
        }
    }

    fn layout_with_exe(dir: &Path) -> InstallLayout {
        let layout = InstallLayout::from_root(dir);
        std::fs::create_dir_all(layout.tool_dir()).unwrap();
        std::fs::write(layout.tool_dir().join("winws"), b"").unwrap();
        layout
    }

    fn catalog() -> StrategyCatalog {
        StrategyCatalog::from_profiles(vec![
            StrategyProfile::new("General", "{ZAPRET}/winws", "--wf-tcp=443"),
            StrategyProfile::new("Missing", "{ZAPRET}/nope", "--wf-tcp=80"),
        ])
    }

    #[tokio::test]
    async fn test_invalid_index_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut cleaner = MockTestCleaner::new();
        cleaner.expect_clean().times(1).returning(CleanupReport::default);

        let supervisor = ProcessSupervisor::new(
            SupervisorOptions::new(
                layout_with_exe(dir.path()),
                Arc::new(cleaner),
                Arc::new(RefusingLauncher),
            )
            .with_catalog(catalog()),
        );

        let err = supervisor.start(7).await.unwrap_err();
        assert!(matches!(err, Error::InvalidIndex { index: 7, len: 2 }));
        assert_eq!(supervisor.status(), RunStatus::Idle);
        assert_eq!(supervisor.current_index(), 0);
    }

    #[tokio::test]
    async fn test_spawn_failure_returns_to_idle() {
        let dir = tempfile::tempdir().unwrap();
        let mut cleaner = MockTestCleaner::new();
        cleaner.expect_clean().times(1).returning(CleanupReport::default);

        let supervisor = ProcessSupervisor::new(
            SupervisorOptions::new(
                layout_with_exe(dir.path()),
                Arc::new(cleaner),
                Arc::new(RefusingLauncher),
            )
            .with_catalog(catalog()),
        );
        let mut events = supervisor.subscribe();

        let err = supervisor.start(0).await.unwrap_err();
        match err {
            Error::ProcessSpawn { message, .. } => assert!(message.contains("access denied")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(supervisor.status(), RunStatus::Idle);
        assert!(matches!(events.try_recv(), Ok(SupervisorEvent::Error { .. })));
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let mut cleaner = MockTestCleaner::new();
        cleaner.expect_clean().times(1).returning(CleanupReport::default);

        let supervisor = ProcessSupervisor::new(
            SupervisorOptions::new(
                layout_with_exe(dir.path()),
                Arc::new(cleaner),
                Arc::new(RefusingLauncher),
            )
            .with_catalog(catalog()),
        );
        let mut events = supervisor.subscribe();

        let err = supervisor.start(1).await.unwrap_err();
        match err {
            Error::ExecutableNotFound { path } => assert!(path.ends_with("nope")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(supervisor.status(), RunStatus::Idle);
        assert_eq!(supervisor.current_index(), 1);
        assert!(matches!(events.try_recv(), Ok(SupervisorEvent::Error { .. })));
    }

    #[tokio::test]
    async fn test_stop_when_idle_skips_cleaner() {
        let dir = tempfile::tempdir().unwrap();
        let mut cleaner = MockTestCleaner::new();
        cleaner.expect_clean().never();

        let supervisor = ProcessSupervisor::new(
            SupervisorOptions::new(
                layout_with_exe(dir.path()),
                Arc::new(cleaner),
                Arc::new(RefusingLauncher),
            )
            .with_catalog(catalog()),
        );
        let mut events = supervisor.subscribe();

        supervisor.stop().await;
        assert_eq!(supervisor.status(), RunStatus::Idle);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_start_after_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let mut cleaner = MockTestCleaner::new();
        cleaner.expect_clean().never();

        let supervisor = ProcessSupervisor::new(
            SupervisorOptions::new(
                layout_with_exe(dir.path()),
                Arc::new(cleaner),
                Arc::new(RefusingLauncher),
            )
            .with_catalog(catalog()),
        );

        supervisor.shutdown().await;
        supervisor.shutdown().await;
        assert!(matches!(supervisor.start(0).await, Err(Error::ShutDown)));
    }

    #[test]
    fn test_options_from_settings() {
        let mut settings = Settings::default();
        settings.supervisor.default_strategy = 3;
        settings.supervisor.monitor_interval_secs = 30;
        let options = SupervisorOptions::from_settings(&settings, InstallLayout::from_root("/opt/pdpi"))
            .with_catalog(catalog());
        assert_eq!(options.initial_index, 3);
        assert_eq!(options.monitor_interval, Duration::from_secs(30));
        assert!(options.catalog.is_some());
    }

    #[tokio::test]
    async fn test_initial_index_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = ProcessSupervisor::new(
            SupervisorOptions::new(
                layout_with_exe(dir.path()),
                Arc::new(MockTestCleaner::new()),
                Arc::new(RefusingLauncher),
            )
            .with_catalog(catalog())
            .with_initial_index(9),
        );
        assert_eq!(supervisor.current_index(), 0);
    }
}
