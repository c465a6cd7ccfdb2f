//! Strategy process launching
//!
//! The strategy executable is started with piped stdout/stderr. Both pipes
//! are drained by background tasks into the log so a chatty tool can never
//! block on a full pipe.

use crate::command::hide_window;
use crate::traits::{Launcher, SupervisedProcess};
use crate::{PlatformError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long `kill` waits for the process to go away
pub const KILL_WAIT: Duration = Duration::from_secs(5);

/// Everything needed to start one strategy process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Resolved executable path
    pub executable: PathBuf,
    /// Resolved and quoted argument line
    pub args: String,
    /// Working directory of the process
    pub work_dir: PathBuf,
    /// Drain stdout/stderr into the log instead of discarding them
    pub capture_output: bool,
}

impl LaunchRequest {
    /// Create a request with output capture enabled
    pub fn new(
        executable: impl Into<PathBuf>,
        args: impl Into<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executable: executable.into(),
            args: args.into(),
            work_dir: work_dir.into(),
            capture_output: true,
        }
    }

    /// Enable or disable output capture
    #[must_use]
    pub fn with_capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.executable);

        // Windows programs parse their own command line; hand it over as-is
        // so the quoting done by the caller survives.
        #[cfg(windows)]
        cmd.raw_arg(&self.args);
        #[cfg(not(windows))]
        cmd.args(pdpi_core::cmdline::split_arguments(&self.args));

        let output = || {
            if self.capture_output {
                Stdio::piped()
            } else {
                Stdio::null()
            }
        };

        cmd.current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(output())
            .stderr(output())
            .kill_on_drop(true);
        hide_window(&mut cmd);
        cmd
    }
}

/// Launches strategy processes with `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    /// Create a launcher
    pub fn new() -> Self {
        Self
    }

    /// Spawn the process described by `request`
    pub fn spawn(&self, request: &LaunchRequest) -> Result<StrategyProcess> {
        let mut child = request
            .command()
            .spawn()
            .map_err(|source| PlatformError::Spawn {
                program: request.executable.display().to_string(),
                source,
            })?;

        let pid = child.id();
        let mut drains = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            drains.push(spawn_drain(stdout, "stdout", pid));
        }
        if let Some(stderr) = child.stderr.take() {
            drains.push(spawn_drain(stderr, "stderr", pid));
        }

        info!(
            pid,
            executable = %request.executable.display(),
            "Strategy process spawned"
        );

        Ok(StrategyProcess {
            child,
            pid,
            exited: false,
            drains,
        })
    }
}

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn launch(&self, request: &LaunchRequest) -> Result<Box<dyn SupervisedProcess>> {
        Ok(Box::new(self.spawn(request)?))
    }
}

fn spawn_drain<R>(reader: R, stream: &'static str, pid: Option<u32>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end();
                    if !line.is_empty() {
                        debug!(pid, stream, "{line}");
                    }
                }
                Err(e) => {
                    debug!(pid, stream, error = %e, "Output drain stopped");
                    break;
                }
            }
        }
    })
}

/// A running strategy process
///
/// Dropping it kills the process and stops the output drains.
#[derive(Debug)]
pub struct StrategyProcess {
    child: Child,
    pid: Option<u32>,
    exited: bool,
    drains: Vec<JoinHandle<()>>,
}

#[async_trait]
impl SupervisedProcess for StrategyProcess {
    fn id(&self) -> Option<u32> {
        self.pid
    }

    fn has_exited(&mut self) -> Result<bool> {
        if self.exited {
            return Ok(true);
        }
        match self.child.try_wait()? {
            Some(status) => {
                self.exited = true;
                info!(pid = self.pid, %status, "Strategy process exited");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn kill(&mut self) -> Result<()> {
        if self.has_exited().unwrap_or(false) {
            debug!(pid = self.pid, "Process already exited, nothing to kill");
            return Ok(());
        }

        #[cfg(windows)]
        {
            if let Some(pid) = self.pid {
                let pid = pid.to_string();
                if let Err(e) =
                    crate::command::run_command("taskkill", &["/PID", &pid, "/T", "/F"]).await
                {
                    debug!(error = %e, "taskkill failed, falling back to direct kill");
                }
            }
        }

        if let Err(e) = self.child.start_kill() {
            if self.has_exited().unwrap_or(false) {
                return Ok(());
            }
            warn!(pid = self.pid, error = %e, "Failed to kill strategy process");
            return Err(e.into());
        }

        match tokio::time::timeout(KILL_WAIT, self.child.wait()).await {
            Ok(Ok(status)) => {
                self.exited = true;
                info!(pid = self.pid, %status, "Strategy process killed");
                Ok(())
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(PlatformError::timeout("waiting for strategy process exit", KILL_WAIT)),
        }
    }
}

impl Drop for StrategyProcess {
    fn drop(&mut self) {
        for drain in &self.drains {
            drain.abort();
        }
    }
}
