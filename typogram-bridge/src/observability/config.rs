//! Logging configuration read from the environment.

use std::env;
use std::str::FromStr;

/// Filter used when neither the environment nor the caller sets one.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Multi-line output with colors.
    Pretty,
    /// Single-line output.
    #[default]
    Compact,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => Self::default(),
        })
    }
}

/// How log events are filtered and formatted.
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    log_format: LogFormat,
    /// Filter set explicitly through the environment or by the caller.
    log_filter: Option<String>,
    include_location: bool,
    include_thread_names: bool,
    include_thread_ids: bool,
}

impl TracingConfig {
    /// Read the configuration from the process environment.
    ///
    /// - `TYPOGRAM_LOG_FORMAT`: "json", "pretty" or "compact"; pretty on a
    ///   terminal and compact otherwise when unset
    /// - `TYPOGRAM_LOG_LEVEL`, then `RUST_LOG`: filter directives
    /// - `TYPOGRAM_LOG_LOCATION`, `TYPOGRAM_LOG_THREAD_NAMES`,
    ///   `TYPOGRAM_LOG_THREAD_IDS`: "true" or "1" to add those fields
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok(), stderr_is_terminal())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>, terminal: bool) -> Self {
        let log_format = match lookup("TYPOGRAM_LOG_FORMAT") {
            Some(value) => value.parse().unwrap_or_default(),
            None if terminal => LogFormat::Pretty,
            None => LogFormat::Compact,
        };
        let flag = |name: &str| {
            lookup(name)
                .map(|s| s.eq_ignore_ascii_case("true") || s == "1")
                .unwrap_or(false)
        };

        Self {
            log_format,
            log_filter: lookup("TYPOGRAM_LOG_LEVEL").or_else(|| lookup("RUST_LOG")),
            include_location: flag("TYPOGRAM_LOG_LOCATION"),
            include_thread_names: flag("TYPOGRAM_LOG_THREAD_NAMES"),
            include_thread_ids: flag("TYPOGRAM_LOG_THREAD_IDS"),
        }
    }

    /// Use `filter` unless a filter is already set.
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter.get_or_insert_with(|| filter.into());
        self
    }

    /// Get the log format.
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Get the effective filter directives.
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Check if source location should be included.
    pub fn include_location(&self) -> bool {
        self.include_location
    }

    /// Check if thread names should be included.
    pub fn include_thread_names(&self) -> bool {
        self.include_thread_names
    }

    /// Check if thread IDs should be included.
    pub fn include_thread_ids(&self) -> bool {
        self.include_thread_ids
    }
}

/// Logs go to stderr; stdout carries conversion output.
fn stderr_is_terminal() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}
