//! Stray process and driver service cleanup
//!
//! A crashed or previous run can leave `winws` running and the WinDivert
//! driver registered, which makes the next start fail. The cleaner removes
//! both. It is best-effort: every problem is recorded in the returned
//! [`CleanupReport`] and logged, nothing is raised.

use crate::command::{command_output, run_command};
use crate::traits::Cleaner;
use crate::Result;
use async_trait::async_trait;
use pdpi_core::config::SupervisorConfig;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default bound on terminating stray processes
pub const DEFAULT_KILL_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const MAX_GRACE: Duration = Duration::from_secs(1);

/// Outcome of one cleanup pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Stray tool processes found running
    pub processes_found: usize,
    /// Whether every stray process was confirmed gone
    pub processes_terminated: bool,
    /// Services whose deletion succeeded
    pub services_removed: Vec<String>,
    /// Problems encountered, in order
    pub failures: Vec<String>,
}

impl CleanupReport {
    /// No failures were recorded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Write the report to the log
    pub fn log(&self) {
        if self.processes_found > 0 {
            info!(
                found = self.processes_found,
                terminated = self.processes_terminated,
                "Terminated stray strategy processes"
            );
        }
        if !self.services_removed.is_empty() {
            info!(services = ?self.services_removed, "Removed driver services");
        }
        for failure in &self.failures {
            warn!("Cleanup: {failure}");
        }
    }
}

/// Terminates stray tool processes by name and deletes driver services
#[derive(Debug, Clone)]
pub struct ServiceCleaner {
    process_name: String,
    services: Vec<String>,
    kill_timeout: Duration,
}

impl ServiceCleaner {
    /// Create a cleaner for `process_name` (without extension) and `services`
    pub fn new(process_name: impl Into<String>, services: Vec<String>) -> Self {
        Self {
            process_name: process_name.into(),
            services,
            kill_timeout: DEFAULT_KILL_TIMEOUT,
        }
    }

    /// Create a cleaner from the supervisor settings
    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self::new(config.process_name.clone(), config.driver_services.clone())
            .with_kill_timeout(config.cleanup_timeout())
    }

    /// Change the bound on process termination
    #[must_use]
    pub fn with_kill_timeout(mut self, timeout: Duration) -> Self {
        self.kill_timeout = timeout;
        self
    }

    /// Process name this cleaner looks for
    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    /// Services this cleaner removes
    pub fn services(&self) -> &[String] {
        &self.services
    }

    /// Terminate running instances of the tool, graceful first, then forced
    pub async fn terminate_processes(&self, report: &mut CleanupReport) {
        let found = match self.count_processes().await {
            Ok(found) => found,
            Err(e) => {
                report.failures.push(format!("cannot enumerate '{}': {e}", self.process_name));
                return;
            }
        };
        report.processes_found = found;
        if found == 0 {
            debug!(process = %self.process_name, "No stray processes");
            return;
        }

        debug!(process = %self.process_name, found, "Terminating stray processes");
        let grace = MAX_GRACE.min(self.kill_timeout / 2);
        let outcome = tokio::time::timeout(self.kill_timeout, async {
            self.signal(false).await;
            if self.wait_until_gone(grace).await {
                return;
            }
            self.signal(true).await;
            while !self.is_gone().await {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
        .await;

        match outcome {
            Ok(()) => report.processes_terminated = true,
            Err(_) => report.failures.push(format!(
                "'{}' still running after {:?}",
                self.process_name, self.kill_timeout
            )),
        }
    }

    /// Stop and delete every configured driver service
    pub async fn remove_services(&self, report: &mut CleanupReport) {
        #[cfg(windows)]
        {
            for service in &self.services {
                match run_command("net", &["stop", service.as_str()]).await {
                    Ok(0) => debug!(service = %service, "Service stopped"),
                    Ok(code) => debug!(service = %service, code, "net stop returned non-zero"),
                    Err(e) => report.failures.push(e.to_string()),
                }
                match run_command("sc", &["delete", service.as_str()]).await {
                    Ok(0) => report.services_removed.push(service.clone()),
                    Ok(code) => debug!(service = %service, code, "sc delete returned non-zero"),
                    Err(e) => report.failures.push(e.to_string()),
                }
            }
        }

        #[cfg(not(windows))]
        {
            let _ = report;
            debug!(services = ?self.services, "No service manager on this platform, skipping");
        }
    }

    async fn wait_until_gone(&self, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            if self.is_gone().await {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn is_gone(&self) -> bool {
        // An enumeration failure counts as gone; the pass must not spin.
        self.count_processes().await.map_or(true, |n| n == 0)
    }

    #[cfg(windows)]
    fn image_name(&self) -> String {
        if self.process_name.to_ascii_lowercase().ends_with(".exe") {
            self.process_name.clone()
        } else {
            format!("{}.exe", self.process_name)
        }
    }

    #[cfg(windows)]
    async fn count_processes(&self) -> Result<usize> {
        let image = self.image_name();
        let filter = format!("IMAGENAME eq {image}");
        let output = command_output("tasklist", &["/FI", &filter, "/NH", "/FO", "CSV"]).await?;
        let quoted = format!("\"{}\"", image.to_ascii_lowercase());
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| line.to_ascii_lowercase().starts_with(&quoted))
            .count())
    }

    #[cfg(not(windows))]
    async fn count_processes(&self) -> Result<usize> {
        let output = command_output("pgrep", &["-x", &self.process_name]).await?;
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count())
    }

    #[cfg(windows)]
    async fn signal(&self, force: bool) {
        let image = self.image_name();
        let mut args = vec!["/IM", image.as_str()];
        if force {
            args.push("/F");
        }
        log_signal(force, run_command("taskkill", &args).await);
    }

    #[cfg(not(windows))]
    async fn signal(&self, force: bool) {
        let signal = if force { "-KILL" } else { "-TERM" };
        log_signal(force, run_command("pkill", &[signal, "-x", &self.process_name]).await);
    }
}

fn log_signal(force: bool, result: Result<i32>) {
    match result {
        Ok(code) => debug!(force, code, "Termination signal sent"),
        Err(e) => debug!(force, error = %e, "Termination signal failed"),
    }
}

#[async_trait]
impl Cleaner for ServiceCleaner {
    async fn clean(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        self.terminate_processes(&mut report).await;
        self.remove_services(&mut report).await;
        report.log();
        report
    }
}
