//! Tracing subscriber setup shared by the binaries.
//!
//! `SOULSUPPORT_LOG_MODE` selects the sink:
//! - `file`: append to `SOULSUPPORT_LOG_FILE` (default `logs/soulsupport.log`)
//! - `stdout` / `stderr`: the named stream
//! - `auto` (default): the binary's preferred stream
//!
//! Every sink is wrapped in [`SanitizingMakeWriter`]. The filter comes from
//! `RUST_LOG` and defaults to `info`.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::adapters::sanitize::SanitizingMakeWriter;

pub const DEFAULT_LOG_FILE: &str = "logs/soulsupport.log";

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    Stdout,
    Stderr,
    File,
}

impl LogSink {
    /// Resolve a `SOULSUPPORT_LOG_MODE` value against the binary's preference.
    #[must_use]
    pub fn resolve(mode: Option<&str>, preferred: LogSink) -> LogSink {
        match mode.map(str::trim) {
            Some("file") => LogSink::File,
            Some("stdout") => LogSink::Stdout,
            Some("stderr") => LogSink::Stderr,
            _ => preferred,
        }
    }
}

/// Install the global subscriber.
///
/// Binaries that print results on stdout pass `LogSink::Stderr` so the two
/// streams never interleave. Keep the returned guard alive until exit or
/// buffered lines are lost.
///
/// # Errors
/// Returns error if the log file cannot be opened.
pub fn init(preferred: LogSink) -> std::io::Result<WorkerGuard> {
    let mode = std::env::var("SOULSUPPORT_LOG_MODE").ok();
    let sink = LogSink::resolve(mode.as_deref(), preferred);

    let (writer, guard) = match sink {
        LogSink::File => {
            let log_file =
                std::env::var("SOULSUPPORT_LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
            if let Some(parent) = Path::new(&log_file).parent() {
                // Best-effort: the open below reports the real failure.
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_file)?;
            tracing_appender::non_blocking(file)
        }
        LogSink::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogSink::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    Ok(guard)
}
