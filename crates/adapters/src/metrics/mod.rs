//! Concrete metrics held by [`crate::registry::InMemoryMetricRegistry`].
//!
//! Each type implements the read-side capability traits from the ports crate
//! plus its own write API (`inc`, `set`, `update`, `mark`, `time`).

mod counter;
mod gauge;
mod histogram;
mod meter;
mod timer;

pub use counter::AtomicCounter;
pub use gauge::{FnGauge, ValueGauge};
pub use histogram::{DEFAULT_HISTOGRAM_WINDOW, SlidingWindowHistogram};
pub use meter::EwmaMeter;
pub use timer::SlidingWindowTimer;
