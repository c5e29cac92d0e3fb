//! Logging setup for the lineage engine
//!
//! The engine emits structured `tracing` events; this module installs a
//! subscriber for hosts that do not bring their own.
//!
//! Every command on [`crate::engine::GraphEngine`] opens an `INFO` span named
//! after the command (`expand_node`, `collapse_node`, ...). Decisions taken
//! inside (placements, port moves, skipped references) are `debug!` and
//! `trace!` events, so a typical investigation looks like:
//!
//! ```bash
//! RUST_LOG="info,tributary::engine::relations=trace" tributary replay -i graph.json -s steps.txt
//! ```
//!
//! # Environment Variables
//!
//! - `TRIBUTARY_LOG_LEVEL`: log level or filter directive
//! - `TRIBUTARY_LOG_FORMAT`: `compact`, `pretty` or `json`
//! - `RUST_LOG`: standard `tracing-subscriber` filter, used when set
//!
//! WASM builds log to the browser console through `tracing-wasm`.

use std::str::FromStr;

#[cfg(not(target_arch = "wasm32"))]
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

#[cfg(target_arch = "wasm32")]
use tracing_wasm::WASMLayerConfig;

/// Environment variable holding the log level
pub const LOG_LEVEL_ENV: &str = "TRIBUTARY_LOG_LEVEL";

/// Environment variable holding the log format
pub const LOG_FORMAT_ENV: &str = "TRIBUTARY_LOG_FORMAT";

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line events
    Compact,
    /// Multi-line events with source locations
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

impl LogFormat {
    /// All accepted format names
    pub fn variants() -> &'static [&'static str] {
        &["compact", "pretty", "json"]
    }
}

/// Install the global tracing subscriber
///
/// `level` falls back to `TRIBUTARY_LOG_LEVEL`, then `RUST_LOG`, then `info`.
/// `format` falls back to `TRIBUTARY_LOG_FORMAT`, then `compact`.
///
/// Events are written to stderr so command output on stdout stays clean.
/// Fails on an unknown format or when a global subscriber is already set.
pub fn init_logging(
    level: Option<&str>,
    format: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(target_arch = "wasm32")]
    {
        // The browser console has no format choice; filtering happens there.
        let _ = (level, format);
        tracing_wasm::set_as_global_default_with_config(WASMLayerConfig::default());
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let log_level = level
            .map(str::to_string)
            .or_else(|| std::env::var(LOG_LEVEL_ENV).ok())
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| "info".to_string());

        let log_format = format
            .map(str::to_string)
            .or_else(|| std::env::var(LOG_FORMAT_ENV).ok())
            .unwrap_or_else(|| "compact".to_string());

        let format = LogFormat::from_str(&log_format)
            .map_err(|e| format!("Invalid log format: {}", e))?;

        let filter = if log_level == "off" {
            EnvFilter::new("off")
        } else {
            EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info"))
        };

        let registry = Registry::default().with(filter);
        match format {
            LogFormat::Compact => registry
                .with(
                    fmt::Layer::default()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .with_span_events(FmtSpan::NONE),
                )
                .try_init()?,
            LogFormat::Pretty => registry
                .with(
                    fmt::Layer::default()
                        .with_writer(std::io::stderr)
                        .with_file(true)
                        .with_line_number(true)
                        .with_span_events(FmtSpan::ACTIVE)
                        .pretty(),
                )
                .try_init()?,
            LogFormat::Json => registry
                .with(
                    fmt::Layer::default()
                        .with_writer(std::io::stderr)
                        .with_span_events(FmtSpan::CLOSE)
                        .json(),
                )
                .try_init()?,
        }

        Ok(())
    }
}

/// Install the subscriber with defaults (`info`, compact)
pub fn init_default_logging() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str("compact").unwrap(), LogFormat::Compact);
        assert_eq!(LogFormat::from_str("Pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert!(LogFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_log_format_variants() {
        let variants = LogFormat::variants();
        assert_eq!(variants.len(), 3);
        assert!(variants.contains(&"json"));
    }
}
