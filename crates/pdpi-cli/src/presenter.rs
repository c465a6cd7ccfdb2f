//! Renders supervisor events to the terminal, one at a time and in order

use colored::Colorize;
use pdpi_supervisor::SupervisorEvent;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::warn;

/// Format one event as a single terminal line
pub fn render(event: &SupervisorEvent) -> String {
    let title = match event {
        SupervisorEvent::Started { .. } => event.title().green().bold(),
        SupervisorEvent::Stopped | SupervisorEvent::Selected { .. } => event.title().cyan().bold(),
        SupervisorEvent::TerminatedUnexpectedly { .. } => event.title().yellow().bold(),
        SupervisorEvent::Error { .. } => event.title().red().bold(),
    };
    format!("[{title}] {event}")
}

/// Consume `events` until the channel closes
///
/// With `enabled == false` events are drained silently; the supervisor
/// logs them either way.
pub fn spawn(mut events: broadcast::Receiver<SupervisorEvent>, enabled: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if enabled {
                        println!("{}", render(&event));
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Presenter fell behind, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_title_and_message() {
        colored::control::set_override(false);
        let line = render(&SupervisorEvent::Started {
            index: 2,
            name: "Discord".into(),
        });
        assert_eq!(line, "[Strategy started] Started 'Discord' (#2)");
    }

    #[tokio::test]
    async fn test_presenter_ends_when_channel_closes() {
        let (tx, rx) = broadcast::channel(4);
        let handle = spawn(rx, false);
        tx.send(SupervisorEvent::Stopped).unwrap();
        drop(tx);
        handle.await.unwrap();
    }
}
