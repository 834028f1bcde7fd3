//! Registry metrics with values set directly by the test.

use metrics_export_ports::{
    CounterMetric, Counting, GaugeMetric, GaugeValue, HistogramMetric, MeterMetric, Metered,
    Sampling, Snapshot, TimerMetric, UniformSnapshot,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

/// Counter whose count is set by the test.
#[derive(Debug, Default)]
pub struct FixedCounter {
    count: AtomicI64,
}

impl FixedCounter {
    /// Create with an initial count.
    pub fn new(count: i64) -> Self {
        Self {
            count: AtomicI64::new(count),
        }
    }

    /// Replace the count.
    pub fn set(&self, count: i64) {
        self.count.store(count, Ordering::SeqCst);
    }

    /// Add `by` to the count.
    pub fn increment(&self, by: i64) {
        self.count.fetch_add(by, Ordering::SeqCst);
    }
}

impl Counting for FixedCounter {
    fn count(&self) -> i64 {
        self.count.load(Ordering::SeqCst)
    }
}

impl CounterMetric for FixedCounter {}

/// Gauge returning a fixed value.
#[derive(Debug)]
pub struct FixedGauge {
    value: Mutex<GaugeValue>,
}

impl FixedGauge {
    /// Create with an initial value.
    pub fn new(value: impl Into<GaugeValue>) -> Self {
        Self {
            value: Mutex::new(value.into()),
        }
    }

    /// Replace the value.
    pub fn set(&self, value: impl Into<GaugeValue>) {
        *self.value.lock().unwrap() = value.into();
    }
}

impl GaugeMetric for FixedGauge {
    fn value(&self) -> GaugeValue {
        self.value.lock().unwrap().clone()
    }
}

/// Histogram with a fixed count and sample set.
#[derive(Debug, Default)]
pub struct FixedHistogram {
    count: AtomicI64,
    values: Mutex<Vec<f64>>,
}

impl FixedHistogram {
    /// Create with a count and samples.
    pub fn new(count: i64, values: Vec<f64>) -> Self {
        Self {
            count: AtomicI64::new(count),
            values: Mutex::new(values),
        }
    }

    /// Replace the count.
    pub fn set_count(&self, count: i64) {
        self.count.store(count, Ordering::SeqCst);
    }

    /// Replace the samples.
    pub fn set_values(&self, values: Vec<f64>) {
        *self.values.lock().unwrap() = values;
    }
}

impl Counting for FixedHistogram {
    fn count(&self) -> i64 {
        self.count.load(Ordering::SeqCst)
    }
}

impl Sampling for FixedHistogram {
    fn snapshot(&self) -> Box<dyn Snapshot> {
        Box::new(UniformSnapshot::new(self.values.lock().unwrap().clone()))
    }
}

impl HistogramMetric for FixedHistogram {}

/// Rates in `[mean, m1, m5, m15]` order.
pub type Rates = [f64; 4];

/// Meter with a fixed count and fixed per-second rates.
#[derive(Debug, Default)]
pub struct FixedMeter {
    count: AtomicI64,
    rates: Mutex<Rates>,
}

impl FixedMeter {
    /// Create with a count and `[mean, m1, m5, m15]` rates.
    pub fn new(count: i64, rates: Rates) -> Self {
        Self {
            count: AtomicI64::new(count),
            rates: Mutex::new(rates),
        }
    }

    /// Replace the count.
    pub fn set_count(&self, count: i64) {
        self.count.store(count, Ordering::SeqCst);
    }

    /// Replace the rates.
    pub fn set_rates(&self, rates: Rates) {
        *self.rates.lock().unwrap() = rates;
    }

    fn rate_at(&self, index: usize) -> f64 {
        self.rates.lock().unwrap()[index]
    }
}

impl Counting for FixedMeter {
    fn count(&self) -> i64 {
        self.count.load(Ordering::SeqCst)
    }
}

impl Metered for FixedMeter {
    fn mean_rate(&self) -> f64 {
        self.rate_at(0)
    }

    fn one_minute_rate(&self) -> f64 {
        self.rate_at(1)
    }

    fn five_minute_rate(&self) -> f64 {
        self.rate_at(2)
    }

    fn fifteen_minute_rate(&self) -> f64 {
        self.rate_at(3)
    }
}

impl MeterMetric for FixedMeter {}

/// Timer combining a [`FixedMeter`] with samples in nanoseconds.
#[derive(Debug, Default)]
pub struct FixedTimer {
    meter: FixedMeter,
    values: Mutex<Vec<f64>>,
}

impl FixedTimer {
    /// Create with a count, rates, and duration samples.
    pub fn new(count: i64, rates: Rates, values: Vec<f64>) -> Self {
        Self {
            meter: FixedMeter::new(count, rates),
            values: Mutex::new(values),
        }
    }

    /// Replace the count.
    pub fn set_count(&self, count: i64) {
        self.meter.set_count(count);
    }

    /// Replace the duration samples.
    pub fn set_values(&self, values: Vec<f64>) {
        *self.values.lock().unwrap() = values;
    }
}

impl Counting for FixedTimer {
    fn count(&self) -> i64 {
        self.meter.count()
    }
}

impl Metered for FixedTimer {
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

impl Sampling for FixedTimer {
    fn snapshot(&self) -> Box<dyn Snapshot> {
        Box::new(UniformSnapshot::new(self.values.lock().unwrap().clone()))
    }
}

impl TimerMetric for FixedTimer {}
