//! Structured Logger
//!
//! Wraps `tracing` with environment-based level control, JSON console output
//! on request, and an optional rolling file sink.

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// How the global subscriber should be built.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Fallback filter when `RUST_LOG` is unset (e.g. "info").
    pub level: String,
    /// Emit console lines as JSON instead of human-readable text.
    pub json: bool,
    /// Directory for `agrolens.log.YYYY-MM-DD` NDJSON files, if any.
    pub log_dir: Option<PathBuf>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            log_dir: None,
        }
    }
}

/// Initialize the global structured logger. Safe to call more than once;
/// later calls are ignored.
pub fn init_logger(options: &LogOptions) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&options.level));

    let console_layer = if options.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(true)
            .boxed()
    };

    let file_layer = options.log_dir.as_ref().map(|dir| {
        let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "agrolens.log");
        fmt::layer()
            .json()
            .with_writer(file_appender)
            .with_ansi(false)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
