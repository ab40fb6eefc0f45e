use super::config::{LogType, SenderConfig};
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Cannot open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Maps the agent `DebugLevel` onto a tracing level.
pub fn level_filter_for(debug_level: u8) -> LevelFilter {
    match debug_level {
        0 => LevelFilter::OFF,
        1 | 2 => LevelFilter::ERROR,
        3 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}

/// Installs the global subscriber the way the agent logs.
///
/// `LogType=file` appends to `LogFile`; `console` and `system` write to the
/// console, as does any run attached to a terminal. `RUST_LOG` takes
/// precedence over `DebugLevel`.
pub fn setup_logging(config: &SenderConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::builder()
        .with_default_directive(level_filter_for(config.debug_level()).into())
        .from_env_lossy();

    let to_console = matches!(config.log_type(), LogType::Console | LogType::System)
        || std::io::stdout().is_terminal();
    let console_layer = to_console.then(|| fmt::layer().with_target(true).compact());

    let file_layer = match (config.log_type(), config.log_file()) {
        (LogType::File, Some(path)) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::LogFile {
                    path: path.to_path_buf(),
                    source,
                })?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_thread_ids(true),
            )
        }
        _ => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}
