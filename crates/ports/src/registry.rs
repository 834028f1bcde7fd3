//! Metric registry boundary.

use crate::metrics::{CounterMetric, GaugeMetric, HistogramMetric, MeterMetric, TimerMetric};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Name-sorted map of live metrics of one kind.
pub type MetricMap<T> = BTreeMap<Box<str>, Arc<T>>;

/// Point-in-time view of every metric in a registry.
#[derive(Clone, Default)]
pub struct RegistrySnapshot {
    /// Counters by name.
    pub counters: MetricMap<dyn CounterMetric>,
    /// Gauges by name.
    pub gauges: MetricMap<dyn GaugeMetric>,
    /// Histograms by name.
    pub histograms: MetricMap<dyn HistogramMetric>,
    /// Meters by name.
    pub meters: MetricMap<dyn MeterMetric>,
    /// Timers by name.
    pub timers: MetricMap<dyn TimerMetric>,
}

impl RegistrySnapshot {
    /// Total number of metrics across all kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
            + self.gauges.len()
            + self.histograms.len()
            + self.meters.len()
            + self.timers.len()
    }

    /// Returns true when the registry holds no metrics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for RegistrySnapshot {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RegistrySnapshot")
            .field("counters", &self.counters.keys().collect::<Vec<_>>())
            .field("gauges", &self.gauges.keys().collect::<Vec<_>>())
            .field("histograms", &self.histograms.keys().collect::<Vec<_>>())
            .field("meters", &self.meters.keys().collect::<Vec<_>>())
            .field("timers", &self.timers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Receives registry add/remove notifications.
///
/// All callbacks default to no-ops. Callbacks may run concurrently with a
/// harvest, on any thread.
#[allow(unused_variables, reason = "default callbacks ignore their arguments")]
pub trait RegistryListener: Send + Sync {
    /// A counter was registered.
    fn on_counter_added(&self, name: &str, counter: &Arc<dyn CounterMetric>) {}
    /// A counter was removed.
    fn on_counter_removed(&self, name: &str) {}
    /// A gauge was registered.
    fn on_gauge_added(&self, name: &str, gauge: &Arc<dyn GaugeMetric>) {}
    /// A gauge was removed.
    fn on_gauge_removed(&self, name: &str) {}
    /// A histogram was registered.
    fn on_histogram_added(&self, name: &str, histogram: &Arc<dyn HistogramMetric>) {}
    /// A histogram was removed.
    fn on_histogram_removed(&self, name: &str) {}
    /// A meter was registered.
    fn on_meter_added(&self, name: &str, meter: &Arc<dyn MeterMetric>) {}
    /// A meter was removed.
    fn on_meter_removed(&self, name: &str) {}
    /// A timer was registered.
    fn on_timer_added(&self, name: &str, timer: &Arc<dyn TimerMetric>) {}
    /// A timer was removed.
    fn on_timer_removed(&self, name: &str) {}
}

/// Handle returned by [`MetricRegistryPort::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "listener-{}", self.0)
    }
}

/// Boundary contract for a live metric registry.
pub trait MetricRegistryPort: Send + Sync {
    /// Snapshot every metric currently registered.
    fn snapshot(&self) -> RegistrySnapshot;

    /// Subscribe to add/remove notifications.
    fn add_listener(&self, listener: Arc<dyn RegistryListener>) -> ListenerId;

    /// Unsubscribe; returns false when `id` was not registered.
    fn remove_listener(&self, id: ListenerId) -> bool;
}
