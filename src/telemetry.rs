//! Logging setup.

use std::path::Path;

use clap::ValueEnum;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter (`RUST_LOG` syntax).
pub const LOG_ENV: &str = "LICENSE_DASH_LOG";
const DEFAULT_FILTER: &str = "warn";
const LOG_FILE_PREFIX: &str = "license-dash.log";

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[value(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber.
///
/// Logs go to stderr, or to a daily-rolling file in `log_dir`. The returned
/// guard flushes the file writer and must be held until exit.
pub fn init(format: LogFormat, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let (writer, guard) = match log_dir {
        Some(dir) => {
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX));
            (fmt::writer::BoxMakeWriter::new(writer), Some(guard))
        }
        None => (fmt::writer::BoxMakeWriter::new(std::io::stderr), None),
    };
    let ansi = log_dir.is_none();

    let result = match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt::layer().with_writer(writer).with_ansi(ansi))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt::layer().json().with_writer(writer))
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
    guard
}
