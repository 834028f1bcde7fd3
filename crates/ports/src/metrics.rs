//! Read-side capabilities of live registry metrics.
//!
//! The transformation engine only ever reads metrics. Each registry kind is a
//! combination of the small capability traits below.

use metrics_export_domain::{GaugeValue, MetricKind, RateWindow, Snapshot};

/// Exposes a cumulative count.
pub trait Counting: Send + Sync {
    /// Cumulative count since creation (or last reset).
    fn count(&self) -> i64;
}

/// Exposes throughput rates in events per second.
pub trait Metered: Counting {
    /// Mean rate since creation.
    fn mean_rate(&self) -> f64;

    /// One-minute exponentially weighted rate.
    fn one_minute_rate(&self) -> f64;

    /// Five-minute exponentially weighted rate.
    fn five_minute_rate(&self) -> f64;

    /// Fifteen-minute exponentially weighted rate.
    fn fifteen_minute_rate(&self) -> f64;

    /// Rate for a given window.
    fn rate(&self, window: RateWindow) -> f64 {
        match window {
            RateWindow::Mean => self.mean_rate(),
            RateWindow::OneMinute => self.one_minute_rate(),
            RateWindow::FiveMinute => self.five_minute_rate(),
            RateWindow::FifteenMinute => self.fifteen_minute_rate(),
        }
    }
}

/// Exposes a statistical snapshot of retained samples.
pub trait Sampling: Send + Sync {
    /// Snapshot of the currently retained samples.
    fn snapshot(&self) -> Box<dyn Snapshot>;
}

/// Monotonic counter (may be decremented by its owner).
pub trait CounterMetric: Counting {}

/// Point-in-time value of any type.
pub trait GaugeMetric: Send + Sync {
    /// Current value.
    fn value(&self) -> GaugeValue;
}

/// Distribution of arbitrary values plus an update count.
pub trait HistogramMetric: Counting + Sampling {}

/// Event throughput plus a mark count.
pub trait MeterMetric: Metered {}

/// Duration distribution (nanoseconds) plus call throughput and count.
pub trait TimerMetric: Metered + Sampling {}

/// Borrowed reference to a metric of any kind.
#[derive(Clone, Copy)]
pub enum MetricRef<'a> {
    /// Counter.
    Counter(&'a dyn CounterMetric),
    /// Gauge.
    Gauge(&'a dyn GaugeMetric),
    /// Histogram.
    Histogram(&'a dyn HistogramMetric),
    /// Meter.
    Meter(&'a dyn MeterMetric),
    /// Timer.
    Timer(&'a dyn TimerMetric),
}

impl MetricRef<'_> {
    /// Kind of the referenced metric.
    #[must_use]
    pub const fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Gauge(_) => MetricKind::Gauge,
            Self::Histogram(_) => MetricKind::Histogram,
            Self::Meter(_) => MetricKind::Meter,
            Self::Timer(_) => MetricKind::Timer,
        }
    }

    /// Cumulative count, for kinds that have one.
    #[must_use]
    pub fn count(&self) -> Option<i64> {
        match self {
            Self::Counter(metric) => Some(metric.count()),
            Self::Histogram(metric) => Some(metric.count()),
            Self::Meter(metric) => Some(metric.count()),
            Self::Timer(metric) => Some(metric.count()),
            Self::Gauge(_) => None,
        }
    }
}

impl std::fmt::Debug for MetricRef<'_> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_tuple("MetricRef")
            .field(&self.kind())
            .finish()
    }
}
