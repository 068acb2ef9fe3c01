//! Logging capability and subscriber setup.
//!
//! Library code never writes to stdout/stderr itself. Components take an
//! `Arc<dyn Logger>` so the host editor can route messages to its own log
//! sink; [`TracingLogger`] forwards to `tracing`, and [`RecordingLogger`]
//! keeps lines in memory for tests and previews.
//!
//! **Never log unmasked API keys.** Anything echoed from a flag registry
//! must be rendered with `obfuscate = true`.

use std::error::Error;
use std::sync::{Mutex, OnceLock, PoisonError};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Sink for pipeline diagnostics.
pub trait Logger: Send + Sync {
    fn debug(&self, msg: &str);
    fn info(&self, msg: &str);
    fn warning(&self, msg: &str);
    fn error(&self, msg: &str, err: Option<&dyn Error>);
}

/// Logger that forwards to the `tracing` macros.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, msg: &str) {
        tracing::debug!(target: "wakatime_heartbeat", "{msg}");
    }

    fn info(&self, msg: &str) {
        tracing::info!(target: "wakatime_heartbeat", "{msg}");
    }

    fn warning(&self, msg: &str) {
        tracing::warn!(target: "wakatime_heartbeat", "{msg}");
    }

    fn error(&self, msg: &str, err: Option<&dyn Error>) {
        match err {
            Some(e) => tracing::error!(target: "wakatime_heartbeat", error = %e, "{msg}"),
            None => tracing::error!(target: "wakatime_heartbeat", "{msg}"),
        }
    }
}

/// Severity of a recorded line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// Logger that keeps every line in memory.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: LogLevel, msg: String) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, msg));
    }

    /// All recorded lines, oldest first.
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded messages at `level`.
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Logger for RecordingLogger {
    fn debug(&self, msg: &str) {
        self.push(LogLevel::Debug, msg.to_string());
    }

    fn info(&self, msg: &str) {
        self.push(LogLevel::Info, msg.to_string());
    }

    fn warning(&self, msg: &str) {
        self.push(LogLevel::Warning, msg.to_string());
    }

    fn error(&self, msg: &str, err: Option<&dyn Error>) {
        let line = match err {
            Some(e) => format!("{msg}: {e}"),
            None => msg.to_string(),
        };
        self.push(LogLevel::Error, line);
    }
}

/// Error type for logging initialization
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("logging already initialized")]
    AlreadyInitialized,

    #[error("failed to set global subscriber: {0}")]
    SetSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Install the global stderr subscriber.
///
/// `RUST_LOG` overrides `level`; `verbose` forces `debug`.
pub fn init_logging(level: &str, verbose: bool) -> Result<(), LogError> {
    if LOGGING_INITIALIZED.set(()).is_err() {
        return Err(LogError::AlreadyInitialized);
    }

    let level = if verbose { "debug" } else { level };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(true),
    );
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
