//! Health monitor for the running strategy process
//!
//! One monitor task runs per successful start. It sleeps outside the
//! supervisor lock, then takes the lock and checks whether any owned process
//! has exited. If so it stops, announces the termination and starts the same
//! strategy again; that start spawns a fresh monitor and this one ends.

use crate::event::SupervisorEvent;
use crate::state::RunStatus;
use crate::supervisor::Inner;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Spawn the monitor for the run guarded by `token`
pub(crate) fn spawn(inner: Arc<Inner>, token: CancellationToken) {
    tokio::spawn(run(inner, token));
}

async fn run(inner: Arc<Inner>, token: CancellationToken) {
    let interval = inner.monitor_interval;
    debug!(?interval, "Monitor started");
    loop {
        tokio::select! {
            () = token.cancelled() => {
                debug!("Monitor cancelled");
                return;
            }
            () = tokio::time::sleep(interval) => {}
        }

        if !check(Arc::clone(&inner), token.clone()).await {
            return;
        }
    }
}

/// One health check; `false` ends the monitor
///
/// Boxed because a recovery starts a new monitor from inside this future.
fn check(inner: Arc<Inner>, token: CancellationToken) -> Pin<Box<dyn Future<Output = bool> + Send>> {
    Box::pin(async move {
        let mut state = inner.state.lock().await;
        if token.is_cancelled() || state.status != RunStatus::Running || state.processes.is_empty() {
            debug!("Nothing left to monitor");
            return false;
        }

        let exited = state.processes.iter_mut().any(|process| match process.has_exited() {
            Ok(exited) => exited,
            Err(e) => {
                warn!(pid = process.id(), error = %e, "Cannot read process state, treating as exited");
                true
            }
        });
        if !exited {
            return true;
        }

        // Restart what ran, not the current selection
        let Some(index) = state.running else {
            return false;
        };
        let name = inner.strategy_name(index);
        warn!(strategy = %name, "Strategy process terminated unexpectedly, restarting");

        inner.stop_locked(&mut state).await;
        inner.emit(SupervisorEvent::TerminatedUnexpectedly { index, name });
        if let Err(e) = inner.start_locked(&mut state, index).await {
            error!("Restart failed: {e}");
        }
        false
    })
}
