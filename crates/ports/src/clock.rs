//! Time source boundary.

/// Wall-clock time source in epoch milliseconds.
pub trait ClockPort: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}
