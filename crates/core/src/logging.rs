use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// How a process wants its logs
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// File name prefix of the rolling log, e.g. `scan` → `scan.2024-01-21`
    pub component: String,
    /// Mirror events on stderr
    pub stderr: bool,
    /// Write the rolling log file under [`log_dir`]
    pub file: bool,
    /// Filter directive used when `RUST_LOG` is unset
    pub default_level: String,
}

impl LoggingConfig {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            stderr: true,
            file: true,
            default_level: "info".to_string(),
        }
    }
}

/// Directory holding the rolling log files
pub fn log_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rescope/logs")
}

/// Install the global subscriber. Keep the returned guard alive until exit
/// so buffered file output is flushed.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let mut guard = None;
    let file_layer = config.file.then(|| {
        let dir = log_dir();
        let _ = std::fs::create_dir_all(&dir);
        let appender = tracing_appender::rolling::daily(&dir, &config.component);
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(appender);
        guard = Some(worker_guard);
        fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed()
    });

    let stderr_layer = config.stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
            .boxed()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    guard
}
