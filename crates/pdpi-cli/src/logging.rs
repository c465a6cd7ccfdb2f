//! Logging initialization

use anyhow::{Context, Result};
use pdpi_core::config::LoggingConfig;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::args::{Args, LogFormat};

/// Initialize logging from CLI arguments, falling back to the settings file
///
/// The returned guard flushes the log file; keep it alive until exit.
pub fn init(args: &Args, config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(level(args, config).into())
        .from_env_lossy();

    let format = if args.log_format == LogFormat::Text && config.json_format {
        LogFormat::Json
    } else {
        args.log_format
    };

    let log_file = args
        .log_file
        .as_deref()
        .or_else(|| config.file.as_deref().map(Path::new));
    let (file_writer, guard) = match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Text => {
            let console = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(args.verbose >= 2)
                .with_thread_ids(args.verbose >= 3)
                .with_file(args.verbose >= 3)
                .with_line_number(args.verbose >= 3);
            let file_layer = file_writer.map(|w| fmt::layer().with_ansi(false).with_writer(w));
            registry.with(console).with(file_layer).init();
        }
        LogFormat::Json => {
            let console = fmt::layer().json().with_writer(std::io::stderr);
            let file_layer = file_writer.map(|w| fmt::layer().json().with_writer(w));
            registry.with(console).with(file_layer).init();
        }
        LogFormat::Compact => {
            let console = fmt::layer().compact().with_writer(std::io::stderr);
            let file_layer =
                file_writer.map(|w| fmt::layer().compact().with_ansi(false).with_writer(w));
            registry.with(console).with(file_layer).init();
        }
    }

    Ok(guard)
}

/// Effective level: `-q` and `-v` win over the configured level
fn level(args: &Args, config: &LoggingConfig) -> Level {
    if args.quiet {
        return Level::ERROR;
    }
    match args.verbose {
        0 => config.level.parse().unwrap_or(Level::INFO),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn config(level: &str) -> LoggingConfig {
        LoggingConfig {
            level: level.to_string(),
            ..LoggingConfig::default()
        }
    }

    #[test]
    fn test_level_from_flags() {
        let args = Args::parse_from(["penguin-dpi", "-vv", "list"]);
        assert_eq!(level(&args, &config("warn")), Level::TRACE);

        let args = Args::parse_from(["penguin-dpi", "-q", "-v", "list"]);
        assert_eq!(level(&args, &config("info")), Level::ERROR);
    }

    #[test]
    fn test_level_from_config() {
        let args = Args::parse_from(["penguin-dpi", "list"]);
        assert_eq!(level(&args, &config("warn")), Level::WARN);
        assert_eq!(level(&args, &config("nonsense")), Level::INFO);
    }
}
