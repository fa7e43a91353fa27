//!
//! src/logging.rs  Andrew Belles  Sept 13th, 2025
//!
//! Initializes logger. Logs go to stderr so that previews and results
//! printed on stdout stay clean
//!
//!

use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use tracing_error::ErrorLayer;
use tracing_appender::non_blocking;

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::SyncError;

/// Must be held until exit or buffered lines are lost
pub struct LoggingGuard(tracing_appender::non_blocking::WorkerGuard);

pub fn init_logging(cfg: &LoggingConfig) -> Result<LoggingGuard, SyncError> {
    let (writer, guard) = non_blocking(std::io::stderr());
    let filter = std::env::var("RUST_LOG")
        .ok()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(cfg.filter_directives.clone()));

    let time = fmt::time::UtcTime::rfc_3339();
    let fmt_layer = fmt::layer()
        .with_writer(writer)
        .with_timer(time)
        .with_target(cfg.include_target)
        .with_file(cfg.include_file_line)
        .with_line_number(cfg.include_file_line);

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default());

    let init = match cfg.format {
        LogFormat::Json => registry
            .with(fmt_layer
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(true))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt_layer.with_ansi(cfg.with_ansi))
            .try_init(),
    };
    init.map_err(|e| SyncError::Config(format!("logger init: {e}")))?;

    Ok( LoggingGuard(guard) )
}
