//! # metrics-export-testkit
//!
//! Test doubles for the metrics-export ports.
//! This crate depends on `ports` and `shared`.

pub mod errors;
pub mod in_memory;
pub mod metrics;

pub use in_memory::{
    FailingSender, FakeRegistry, GatedSender, ManualClock, NoopLogger, RecordingLogger,
    RecordingSender,
};
pub use metrics::{FixedCounter, FixedGauge, FixedHistogram, FixedMeter, FixedTimer};

/// Returns the testkit crate version.
#[must_use]
pub const fn testkit_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
