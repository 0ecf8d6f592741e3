//! Subscriber setup: stderr console output plus optional rotating JSON files
//!
//! # Example
//!
//! ```no_run
//! use pganon::logging::init_logging;
//! use pganon::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//! ```

use crate::config::LoggingConfig;
use crate::domain::{AnonymizerError, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Name of the log file inside `logging.local_path`
pub const LOG_FILE_NAME: &str = "pganon.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the non-blocking file writer alive; logs are flushed on drop
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global subscriber
///
/// Human-readable lines go to stderr. With `logging.local_enabled`, JSON
/// lines are also appended to [`LOG_FILE_NAME`] under `logging.local_path`.
/// `RUST_LOG` takes precedence over `level` when set.
///
/// # Errors
///
/// Returns a configuration error for an unknown level, an unusable log
/// directory, or when a global subscriber is already installed.
pub fn init_logging(level: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let directive = format!("pganon={}", parse_log_level(level)?);
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive));

    let mut layers: Vec<BoxedLayer> = vec![console_layer(filter())];
    let mut file_guard = None;
    if config.local_enabled {
        let (layer, guard) = file_layer(config, filter())?;
        layers.push(layer);
        file_guard = Some(guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| AnonymizerError::Configuration(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!(
        local_enabled = config.local_enabled,
        local_path = %config.local_path,
        rotation = %config.local_rotation,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn console_layer(filter: EnvFilter) -> BoxedLayer {
    tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter)
        .boxed()
}

fn file_layer(config: &LoggingConfig, filter: EnvFilter) -> Result<(BoxedLayer, WorkerGuard)> {
    std::fs::create_dir_all(&config.local_path).map_err(|e| {
        AnonymizerError::Configuration(format!(
            "Failed to create log directory {}: {}",
            config.local_path, e
        ))
    })?;

    let appender = RollingFileAppender::new(
        rotation(&config.local_rotation),
        &config.local_path,
        LOG_FILE_NAME,
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_thread_ids(true)
        .with_writer(writer)
        .with_filter(filter)
        .boxed();
    Ok((layer, guard))
}

fn rotation(name: &str) -> Rotation {
    match name {
        "hourly" => Rotation::HOURLY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    let parsed = match level.to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            return Err(AnonymizerError::Configuration(format!(
                "Invalid log level '{}', expected trace, debug, info, warn or error",
                level
            )))
        }
    };
    Ok(parsed)
}
