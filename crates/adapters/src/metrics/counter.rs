use metrics_export_ports::{CounterMetric, Counting};
use std::sync::atomic::{AtomicI64, Ordering};

/// Lock-free counter. May go down as well as up.
#[derive(Debug, Default)]
pub struct AtomicCounter {
    count: AtomicI64,
}

impl AtomicCounter {
    /// Create a counter at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            count: AtomicI64::new(0),
        }
    }

    /// Add one.
    pub fn inc(&self) {
        self.inc_by(1);
    }

    /// Add `by`.
    pub fn inc_by(&self, by: i64) {
        self.count.fetch_add(by, Ordering::Relaxed);
    }

    /// Subtract one.
    pub fn dec(&self) {
        self.dec_by(1);
    }

    /// Subtract `by`.
    pub fn dec_by(&self, by: i64) {
        self.count.fetch_sub(by, Ordering::Relaxed);
    }
}

impl Counting for AtomicCounter {
    fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl CounterMetric for AtomicCounter {}
