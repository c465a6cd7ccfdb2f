//! Short-lived helper commands (`sc`, `net`, `taskkill`, `pkill`, ...)

use crate::{PlatformError, Result};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::trace;

/// Hide the console window of a child process on Windows
#[cfg(windows)]
pub(crate) fn hide_window(cmd: &mut Command) {
    cmd.creation_flags(winapi::um::winbase::CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
pub(crate) fn hide_window(_cmd: &mut Command) {}

fn build(program: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
    hide_window(&mut cmd);
    cmd
}

fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a command to completion and return its exit code
///
/// Output is discarded. A process killed by a signal reports `-1`.
pub async fn run_command(program: &str, args: &[&str]) -> Result<i32> {
    let status = build(program, args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|source| PlatformError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let code = status.code().unwrap_or(-1);
    trace!(command = %command_line(program, args), code, "Command finished");
    Ok(code)
}

/// Run a command to completion and capture its output
pub async fn command_output(program: &str, args: &[&str]) -> Result<Output> {
    build(program, args)
        .output()
        .await
        .map_err(|source| PlatformError::Spawn {
            program: program.to_string(),
            source,
        })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_command_exit_code() {
        assert_eq!(run_command("true", &[]).await.unwrap(), 0);
        assert_ne!(run_command("false", &[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_run_command_missing_program() {
        let err = run_command("definitely-not-a-real-program-pdpi", &[]).await.unwrap_err();
        assert!(matches!(err, PlatformError::Spawn { .. }));
    }

    #[test]
    fn test_command_line() {
        assert_eq!(command_line("sc", &["delete", "WinDivert"]), "sc delete WinDivert");
        assert_eq!(command_line("true", &[]), "true");
    }

    #[tokio::test]
    async fn test_command_output() {
        let output = command_output("echo", &["hello"]).await.unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }
}
