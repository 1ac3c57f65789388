//! Tracing subscriber setup with format selection.

use anyhow::{Context, Result};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use super::{DEFAULT_LOG_FILTER, LogFormat, TracingConfig};

/// Guard returned by [`init_tracing`].
///
/// Keep it alive for the duration of the program.
#[must_use = "dropping the guard ends the logging session"]
pub struct TracingGuard {
    format: LogFormat,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        tracing::trace!(format = ?self.format, "Tracing shut down");
    }
}

/// Initialize tracing with the given configuration.
///
/// Events are written to stderr so that stdout stays free for conversion
/// output.
///
/// # Example
///
/// ```no_run
/// # use typogram_bridge::observability::{TracingConfig, init_tracing};
/// # fn main() -> anyhow::Result<()> {
/// let _guard = init_tracing(TracingConfig::from_env())?;
/// # Ok(())
/// # }
/// ```
pub fn init_tracing(config: TracingConfig) -> Result<TracingGuard> {
    // Create env filter from config
    let filter = EnvFilter::try_new(config.log_filter())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match config.log_format() {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_file(config.include_location())
                        .with_line_number(config.include_location())
                        .with_thread_names(config.include_thread_names())
                        .with_thread_ids(config.include_thread_ids())
                        .with_span_events(FmtSpan::CLOSE)
                        .flatten_event(true),
                )
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr)
                        .with_file(config.include_location())
                        .with_line_number(config.include_location())
                        .with_thread_names(config.include_thread_names())
                        .with_thread_ids(config.include_thread_ids()),
                )
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .compact()
                        .with_writer(std::io::stderr)
                        .with_file(config.include_location())
                        .with_line_number(config.include_location())
                        .with_thread_names(config.include_thread_names())
                        .with_thread_ids(config.include_thread_ids()),
                )
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
    }

    tracing::debug!(
        format = ?config.log_format(),
        filter = config.log_filter(),
        "Tracing initialized"
    );

    Ok(TracingGuard {
        format: config.log_format(),
    })
}
