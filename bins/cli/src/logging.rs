//! Diagnostic logging setup for long-running commands.

use crate::format::LogFormat;
use metrics_export_adapters::{JsonLogger, StderrLogSink, TracingLogger};
use metrics_export_ports::{LogLevel, LoggerPort};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Env var holding the log filter directive; `RUST_LOG` is the fallback.
pub const ENV_LOG: &str = "MEX_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Resolve the filter directive from `MEX_LOG`, then `RUST_LOG`, then `info`.
pub fn env_filter_directive(lookup: impl Fn(&str) -> Option<String>) -> String {
    [ENV_LOG, "RUST_LOG"]
        .into_iter()
        .filter_map(|name| lookup(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}

/// Install the global `tracing` subscriber writing to stderr.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(directive: &str) {
    let filter =
        EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

/// Build the logger handed to the exporter.
pub fn build_logger(format: LogFormat, directive: &str) -> Arc<dyn LoggerPort> {
    match format {
        LogFormat::Text => Arc::new(TracingLogger),
        LogFormat::Json => Arc::new(
            JsonLogger::new(Arc::new(StderrLogSink)).with_min_level(min_level(directive)),
        ),
    }
}

/// Lowest level admitted by the global part of a filter directive.
///
/// Per-target directives (`crate=debug`) are ignored; the JSON logger has no
/// notion of targets.
pub fn min_level(directive: &str) -> LogLevel {
    directive
        .split(',')
        .map(str::trim)
        .filter(|part| !part.contains('='))
        .find_map(|part| match part.to_ascii_lowercase().as_str() {
            "trace" | "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" | "off" => Some(LogLevel::Error),
            _ => None,
        })
        .unwrap_or(LogLevel::Info)
}
