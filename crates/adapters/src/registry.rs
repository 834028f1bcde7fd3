//! In-memory metric registry adapter.

use crate::clock::SystemClock;
use crate::metrics::{
    AtomicCounter, EwmaMeter, SlidingWindowHistogram, SlidingWindowTimer, ValueGauge,
};
use metrics_export_ports::{
    ClockPort, CounterMetric, GaugeMetric, HistogramMetric, ListenerId, MeterMetric,
    MetricKind, MetricRegistryPort, RegistryListener, RegistrySnapshot, TimerMetric,
};
use metrics_export_shared::{ErrorCode, ErrorEnvelope, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone)]
enum RegisteredMetric {
    Counter(Arc<AtomicCounter>),
    ValueGauge(Arc<ValueGauge>),
    Gauge(Arc<dyn GaugeMetric>),
    Histogram(Arc<SlidingWindowHistogram>),
    Meter(Arc<EwmaMeter>),
    Timer(Arc<SlidingWindowTimer>),
}

impl RegisteredMetric {
    const fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::ValueGauge(_) | Self::Gauge(_) => MetricKind::Gauge,
            Self::Histogram(_) => MetricKind::Histogram,
            Self::Meter(_) => MetricKind::Meter,
            Self::Timer(_) => MetricKind::Timer,
        }
    }

    fn notify_added(&self, name: &str, listener: &dyn RegistryListener) {
        match self {
            Self::Counter(metric) => {
                let metric: Arc<dyn CounterMetric> = metric.clone();
                listener.on_counter_added(name, &metric);
            },
            Self::ValueGauge(metric) => {
                let metric: Arc<dyn GaugeMetric> = metric.clone();
                listener.on_gauge_added(name, &metric);
            },
            Self::Gauge(metric) => listener.on_gauge_added(name, metric),
            Self::Histogram(metric) => {
                let metric: Arc<dyn HistogramMetric> = metric.clone();
                listener.on_histogram_added(name, &metric);
            },
            Self::Meter(metric) => {
                let metric: Arc<dyn MeterMetric> = metric.clone();
                listener.on_meter_added(name, &metric);
            },
            Self::Timer(metric) => {
                let metric: Arc<dyn TimerMetric> = metric.clone();
                listener.on_timer_added(name, &metric);
            },
        }
    }

    fn notify_removed(&self, name: &str, listener: &dyn RegistryListener) {
        match self.kind() {
            MetricKind::Counter => listener.on_counter_removed(name),
            MetricKind::Gauge => listener.on_gauge_removed(name),
            MetricKind::Histogram => listener.on_histogram_removed(name),
            MetricKind::Meter => listener.on_meter_removed(name),
            MetricKind::Timer => listener.on_timer_removed(name),
        }
    }

    fn insert_into(&self, name: &str, snapshot: &mut RegistrySnapshot) {
        match self {
            Self::Counter(metric) => {
                snapshot.counters.insert(name.into(), metric.clone());
            },
            Self::ValueGauge(metric) => {
                snapshot.gauges.insert(name.into(), metric.clone());
            },
            Self::Gauge(metric) => {
                snapshot.gauges.insert(name.into(), Arc::clone(metric));
            },
            Self::Histogram(metric) => {
                snapshot.histograms.insert(name.into(), metric.clone());
            },
            Self::Meter(metric) => {
                snapshot.meters.insert(name.into(), metric.clone());
            },
            Self::Timer(metric) => {
                snapshot.timers.insert(name.into(), metric.clone());
            },
        }
    }
}

#[derive(Default)]
struct RegistryState {
    metrics: BTreeMap<Box<str>, RegisteredMetric>,
    listeners: BTreeMap<ListenerId, Arc<dyn RegistryListener>>,
    next_listener: u64,
}

/// Thread-safe registry of named metrics.
///
/// Names are unique across kinds. The typed accessors get-or-create; asking
/// for an existing name under a different kind is an error. Listener
/// callbacks always run after the internal lock is released.
pub struct InMemoryMetricRegistry {
    clock: Arc<dyn ClockPort>,
    state: Mutex<RegistryState>,
}

impl InMemoryMetricRegistry {
    /// Create an empty registry whose meters and timers use the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty registry whose meters and timers use `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn ClockPort>) -> Self {
        Self {
            clock,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Get or create the counter called `name`.
    pub fn counter(&self, name: &str) -> Result<Arc<AtomicCounter>> {
        self.get_or_insert(
            name,
            MetricKind::Counter,
            |metric| match metric {
                RegisteredMetric::Counter(counter) => Some(Arc::clone(counter)),
                _ => None,
            },
            || RegisteredMetric::Counter(Arc::new(AtomicCounter::new())),
        )
    }

    /// Get or create the settable gauge called `name`.
    pub fn gauge(&self, name: &str) -> Result<Arc<ValueGauge>> {
        self.get_or_insert(
            name,
            MetricKind::Gauge,
            |metric| match metric {
                RegisteredMetric::ValueGauge(gauge) => Some(Arc::clone(gauge)),
                _ => None,
            },
            || RegisteredMetric::ValueGauge(Arc::new(ValueGauge::new())),
        )
    }

    /// Get or create the histogram called `name`.
    pub fn histogram(&self, name: &str) -> Result<Arc<SlidingWindowHistogram>> {
        self.get_or_insert(
            name,
            MetricKind::Histogram,
            |metric| match metric {
                RegisteredMetric::Histogram(histogram) => Some(Arc::clone(histogram)),
                _ => None,
            },
            || RegisteredMetric::Histogram(Arc::new(SlidingWindowHistogram::new())),
        )
    }

    /// Get or create the meter called `name`.
    pub fn meter(&self, name: &str) -> Result<Arc<EwmaMeter>> {
        self.get_or_insert(
            name,
            MetricKind::Meter,
            |metric| match metric {
                RegisteredMetric::Meter(meter) => Some(Arc::clone(meter)),
                _ => None,
            },
            || RegisteredMetric::Meter(Arc::new(EwmaMeter::new(Arc::clone(&self.clock)))),
        )
    }

    /// Get or create the timer called `name`.
    pub fn timer(&self, name: &str) -> Result<Arc<SlidingWindowTimer>> {
        self.get_or_insert(
            name,
            MetricKind::Timer,
            |metric| match metric {
                RegisteredMetric::Timer(timer) => Some(Arc::clone(timer)),
                _ => None,
            },
            || {
                RegisteredMetric::Timer(Arc::new(SlidingWindowTimer::new(Arc::clone(
                    &self.clock,
                ))))
            },
        )
    }

    /// Register a caller-provided gauge. Fails when `name` is taken.
    pub fn register_gauge(&self, name: &str, gauge: Arc<dyn GaugeMetric>) -> Result<()> {
        let name = validate_name(name)?;
        let metric = RegisteredMetric::Gauge(gauge);
        let listeners = {
            let mut state = self.lock();
            if let Some(existing) = state.metrics.get(name) {
                return Err(ErrorEnvelope::expected(
                    ErrorCode::new("registry", "already_registered"),
                    format!("a {} named `{name}` is already registered", existing.kind()),
                )
                .with_metadata("name", name));
            }
            state.metrics.insert(name.into(), metric.clone());
            listeners_of(&state)
        };
        for listener in &listeners {
            metric.notify_added(name, listener.as_ref());
        }
        Ok(())
    }

    /// Remove the metric called `name`; returns false when it did not exist.
    pub fn remove(&self, name: &str) -> bool {
        let (removed, listeners) = {
            let mut state = self.lock();
            let removed = state.metrics.remove(name);
            (removed, listeners_of(&state))
        };
        let Some(removed) = removed else {
            return false;
        };
        for listener in &listeners {
            removed.notify_removed(name, listener.as_ref());
        }
        true
    }

    /// Number of registered metrics across every kind.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().metrics.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_or_insert<T: ?Sized>(
        &self,
        name: &str,
        kind: MetricKind,
        extract: impl Fn(&RegisteredMetric) -> Option<Arc<T>>,
        create: impl FnOnce() -> RegisteredMetric,
    ) -> Result<Arc<T>> {
        let name = validate_name(name)?;
        let (metric, listeners) = {
            let mut state = self.lock();
            if let Some(existing) = state.metrics.get(name) {
                return extract(existing).ok_or_else(|| kind_conflict(name, existing, kind));
            }
            let metric = create();
            state.metrics.insert(name.into(), metric.clone());
            (metric, listeners_of(&state))
        };
        for listener in &listeners {
            metric.notify_added(name, listener.as_ref());
        }
        extract(&metric).ok_or_else(|| {
            ErrorEnvelope::invariant(
                ErrorCode::internal(),
                format!("created metric `{name}` does not match requested kind {kind}"),
            )
        })
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryMetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryMetricRegistry {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        formatter
            .debug_struct("InMemoryMetricRegistry")
            .field("metrics", &state.metrics.keys().collect::<Vec<_>>())
            .field("listeners", &state.listeners.len())
            .finish_non_exhaustive()
    }
}

impl MetricRegistryPort for InMemoryMetricRegistry {
    fn snapshot(&self) -> RegistrySnapshot {
        let state = self.lock();
        let mut snapshot = RegistrySnapshot::default();
        for (name, metric) in &state.metrics {
            metric.insert_into(name, &mut snapshot);
        }
        snapshot
    }

    fn add_listener(&self, listener: Arc<dyn RegistryListener>) -> ListenerId {
        let (id, existing) = {
            let mut state = self.lock();
            state.next_listener += 1;
            let id = ListenerId::new(state.next_listener);
            state.listeners.insert(id, Arc::clone(&listener));
            let existing: Vec<(Box<str>, RegisteredMetric)> = state
                .metrics
                .iter()
                .map(|(name, metric)| (name.clone(), metric.clone()))
                .collect();
            (id, existing)
        };
        // Catch the new listener up on everything already registered.
        for (name, metric) in &existing {
            metric.notify_added(name, listener.as_ref());
        }
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.lock().listeners.remove(&id).is_some()
    }
}

fn listeners_of(state: &RegistryState) -> Vec<Arc<dyn RegistryListener>> {
    state.listeners.values().cloned().collect()
}

fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ErrorEnvelope::expected(
            ErrorCode::new("registry", "invalid_name"),
            "metric name must be non-empty",
        ));
    }
    Ok(trimmed)
}

fn kind_conflict(name: &str, existing: &RegisteredMetric, requested: MetricKind) -> ErrorEnvelope {
    let existing_kind = existing.kind();
    let message = if existing_kind == requested {
        format!("gauge `{name}` was registered with a custom implementation")
    } else {
        format!("metric `{name}` is a {existing_kind}, not a {requested}")
    };
    ErrorEnvelope::expected(ErrorCode::new("registry", "kind_conflict"), message)
        .with_metadata("name", name)
        .with_metadata("existingKind", existing_kind.as_str())
        .with_metadata("requestedKind", requested.as_str())
}
