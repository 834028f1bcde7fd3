//! # metrics-export-ports
//!
//! Port traits for the metrics-export hexagonal architecture.
//!
//! This crate defines the interfaces between the transformation engine and
//! its collaborators: the metric registry, the batch sender, the clock, and
//! the structured logger. It depends only on `domain` and `shared`.

use std::future::Future;
use std::pin::Pin;

/// Boxed future used by port traits.
///
/// Only the sender boundary is asynchronous; every other port is a plain
/// synchronous call.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod clock;
pub mod logger;
pub mod metrics;
pub mod registry;
pub mod sender;

pub use clock::*;
pub use logger::*;
pub use metrics::*;
pub use registry::*;
pub use sender::*;

// Re-export selected domain types used in port signatures, so adapter crates
// can implement ports without directly depending on `metrics-export-domain`.
pub use metrics_export_domain::{
    Attributes, EmittedMetric, GaugeValue, MetricBatch, MetricKind, RateWindow, Snapshot,
    UniformSnapshot,
};
