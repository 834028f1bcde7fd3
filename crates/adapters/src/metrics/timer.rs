use super::histogram::SlidingWindowHistogram;
use super::meter::EwmaMeter;
use metrics_export_ports::{ClockPort, Counting, Metered, Sampling, Snapshot, TimerMetric};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Timer recording durations in nanoseconds plus call throughput.
#[derive(Debug)]
pub struct SlidingWindowTimer {
    meter: EwmaMeter,
    histogram: SlidingWindowHistogram,
}

impl SlidingWindowTimer {
    /// Create a timer whose throughput is measured against `clock`.
    pub fn new(clock: Arc<dyn ClockPort>) -> Self {
        Self {
            meter: EwmaMeter::new(clock),
            histogram: SlidingWindowHistogram::new(),
        }
    }

    /// Record one call that took `elapsed`.
    #[allow(
        clippy::cast_precision_loss,
        reason = "durations are sampled as doubles"
    )]
    pub fn update(&self, elapsed: Duration) {
        self.histogram.update(elapsed.as_nanos() as f64);
        self.meter.mark();
    }

    /// Run `work`, record how long it took, and return its result.
    pub fn time<T>(&self, work: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let result = work();
        self.update(started.elapsed());
        result
    }
}

impl Counting for SlidingWindowTimer {
    fn count(&self) -> i64 {
        self.meter.count()
    }
}

impl Metered for SlidingWindowTimer {
    fn mean_rate(&self) -> f64 {
        self.meter.mean_rate()
    }

    fn one_minute_rate(&self) -> f64 {
        self.meter.one_minute_rate()
    }

    fn five_minute_rate(&self) -> f64 {
        self.meter.five_minute_rate()
    }

    fn fifteen_minute_rate(&self) -> f64 {
        self.meter.fifteen_minute_rate()
    }
}

impl Sampling for SlidingWindowTimer {
    fn snapshot(&self) -> Box<dyn Snapshot> {
        self.histogram.snapshot()
    }
}

impl TimerMetric for SlidingWindowTimer {}
