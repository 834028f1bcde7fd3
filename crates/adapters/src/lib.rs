//! # metrics-export-adapters
//!
//! Adapter implementations for ports: the system clock, structured loggers,
//! a console batch sender, and an in-memory metric registry with concrete
//! counters, gauges, histograms, meters, and timers.
//! This crate depends on `ports`, `domain`, and `shared`.

pub mod clock;
pub mod console_sender;
pub mod log_sink;
pub mod logger;
pub mod metrics;
pub mod registry;
pub mod tracing_logger;

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub use clock::SystemClock;
pub use console_sender::{ConsoleSender, ConsoleSenderError};
pub use log_sink::{LogSink, StderrLogSink, StdoutLogSink};
pub use logger::JsonLogger;
pub use metrics::{
    AtomicCounter, DEFAULT_HISTOGRAM_WINDOW, EwmaMeter, FnGauge, SlidingWindowHistogram,
    SlidingWindowTimer, ValueGauge,
};
pub use registry::InMemoryMetricRegistry;
pub use tracing_logger::TracingLogger;

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_export_domain::domain_crate_version;
    use metrics_export_ports::ports_crate_version;
    use metrics_export_shared::shared_crate_version;

    fn workspace_deps() -> Vec<String> {
        let cargo_toml = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"));
        let mut deps = Vec::new();
        let mut in_deps = false;
        let mut in_dev_deps = false;

        for raw_line in cargo_toml.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                in_deps = line == "[dependencies]";
                in_dev_deps = line == "[dev-dependencies]";
                continue;
            }
            if !(in_deps || in_dev_deps) {
                continue;
            }
            if line.starts_with("metrics-export-") {
                let key = line.split('=').next().unwrap_or("").trim();
                let name = key.split('.').next().unwrap_or("").trim();
                deps.push(name.to_string());
            }
        }

        deps
    }

    #[test]
    fn adapters_do_not_depend_on_app_or_infra() {
        let deps = workspace_deps();
        let forbidden = ["metrics-export-app", "metrics-export-infra"];

        for dep in &deps {
            assert!(
                !forbidden.contains(&dep.as_str()),
                "forbidden dependency found: {dep}"
            );
        }
    }

    #[test]
    fn adapters_can_use_ports_domain_shared() {
        assert!(!adapters_crate_version().is_empty());
        assert!(!ports_crate_version().is_empty());
        assert!(!domain_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
