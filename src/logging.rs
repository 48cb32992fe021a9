use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "ouzi.log";

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub filter: String,
    /// Daily-rotated file output, enabled by `ENABLE_FILE_LOGS`.
    pub file_dir: Option<PathBuf>,
}

impl LogSettings {
    pub fn from_env(filter: &str) -> Self {
        let file_enabled = std::env::var("ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let file_dir = file_enabled.then(|| {
            PathBuf::from(std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string()))
        });

        Self {
            filter: filter.to_string(),
            file_dir,
        }
    }
}

/// Held by `main` for the lifetime of the process so buffered file lines get flushed.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

pub fn init_tracing(settings: &LogSettings) -> LogGuard {
    let env_filter =
        EnvFilter::try_new(&settings.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let mut file_guard = None;
    let file_layer = settings.file_dir.as_ref().and_then(|dir| {
        if let Err(err) = std::fs::create_dir_all(dir) {
            eprintln!("failed to create log directory {}: {err}", dir.display());
            return None;
        }
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        file_guard = Some(guard);
        Some(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    LogGuard { _file: file_guard }
}
