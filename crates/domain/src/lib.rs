//! # metrics-export-domain
//!
//! Domain value objects for the metric transformation engine.
//!
//! - **Attributes** - `AttributeValue`, `Attributes` (ordered, later writes win)
//! - **Metrics** - `EmittedMetric`, `HarvestInterval`, `MetricBatch`
//! - **Values** - `GaugeValue` with numeric widening
//! - **Snapshots** - `Snapshot`, `UniformSnapshot`
//! - **Units** - `TimeUnit`, `RateWindow`, `MetricKind`
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - No infrastructure or adapter dependencies
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

// Re-export shared types for convenience
pub use metrics_export_shared::shared_crate_version;

// =============================================================================
// DOMAIN MODULES
// =============================================================================

pub mod attributes;
pub mod gauge_value;
pub mod metric;
pub mod snapshot;
pub mod units;

pub use attributes::{AttributeValue, Attributes};
pub use gauge_value::GaugeValue;
pub use metric::{EmittedMetric, HarvestInterval, MetricBatch, SummaryValues};
pub use snapshot::{Snapshot, UniformSnapshot};
pub use units::{MetricKind, RateWindow, TimeUnit, UnitParseError};

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_crate_compiles() {
        let version = domain_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn domain_depends_on_shared() {
        let shared_version = shared_crate_version();
        assert!(!shared_version.is_empty());
    }
}
