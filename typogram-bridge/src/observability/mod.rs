//! Logging setup for typogram hosts.
//!
//! # Configuration
//!
//! Logging format is controlled via `TYPOGRAM_LOG_FORMAT` env var:
//! - `json` - Structured JSON output (for ELK/Loki)
//! - `pretty` - Human-readable colored output (default for TTY)
//! - `compact` - Compact single-line format
//!
//! The filter comes from `TYPOGRAM_LOG_LEVEL`, then `RUST_LOG`, then the
//! caller's default, then `info`.
//!
//! # Example
//!
//! ```no_run
//! use typogram_bridge::observability::{TracingConfig, init_tracing};
//!
//! # fn main() -> anyhow::Result<()> {
//! let _guard = init_tracing(TracingConfig::from_env().with_default_filter("warn"))?;
//! # Ok(())
//! # }
//! ```

mod config;
mod tracing_setup;

pub use config::{DEFAULT_LOG_FILTER, LogFormat, TracingConfig};
pub use tracing_setup::{TracingGuard, init_tracing};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.log_format(), LogFormat::Compact);
        assert_eq!(config.log_filter(), "info");
        assert!(!config.include_location());
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("other".parse::<LogFormat>().unwrap(), LogFormat::Compact);
    }
}
