//! In-memory doubles for the clock, logger, sender, and registry ports.
//!
//! These implementations are intended for:
//! - Unit/integration tests of the transformation engine
//! - Deterministic harvest scenarios driven by a manual clock
//! - Contract tests for the ports layer

use crate::errors::sink_unavailable_error;
use metrics_export_ports::{
    BoxFuture, ClockPort, CounterMetric, GaugeMetric, HistogramMetric, ListenerId, LogEvent,
    LoggerPort, MeterMetric, MetricBatch, MetricBatchSenderPort, MetricRegistryPort,
    RegistryListener, RegistrySnapshot, TimerMetric,
};
use metrics_export_shared::{ErrorCode, ErrorEnvelope, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `now_ms`.
    pub fn new(now_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(now_ms),
        }
    }

    /// Jump to `now_ms`.
    pub fn set_ms(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    /// Move forward by `delta_ms`.
    pub fn advance_ms(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl ClockPort for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// A no-op logger implementation.
#[derive(Debug, Default)]
pub struct NoopLogger;

impl LoggerPort for NoopLogger {
    fn log(&self, _event: LogEvent) {}
}

/// Logger that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    events: Mutex<Vec<LogEvent>>,
}

impl RecordingLogger {
    /// All events so far, oldest first.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Event names so far, oldest first.
    pub fn event_names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.event.to_string())
            .collect()
    }

    /// Events whose name equals `event`.
    pub fn events_named(&self, event: &str) -> Vec<LogEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|candidate| &*candidate.event == event)
            .cloned()
            .collect()
    }
}

impl LoggerPort for RecordingLogger {
    fn log(&self, event: LogEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Sender that records every batch and succeeds.
#[derive(Debug, Default)]
pub struct RecordingSender {
    batches: Mutex<Vec<MetricBatch>>,
}

impl RecordingSender {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every batch sent so far, oldest first.
    pub fn batches(&self) -> Vec<MetricBatch> {
        self.batches.lock().unwrap().clone()
    }

    /// The most recent batch.
    pub fn last(&self) -> Option<MetricBatch> {
        self.batches.lock().unwrap().last().cloned()
    }

    fn record(&self, batch: MetricBatch) {
        self.batches.lock().unwrap().push(batch);
    }
}

impl MetricBatchSenderPort for RecordingSender {
    fn send_batch(&self, batch: MetricBatch) -> BoxFuture<'_, Result<()>> {
        self.record(batch);
        Box::pin(async { Ok(()) })
    }
}

/// Sender that rejects every batch, or only the first few.
#[derive(Debug)]
pub struct FailingSender {
    error: ErrorEnvelope,
    remaining_failures: AtomicUsize,
    attempts: AtomicUsize,
    delivered: RecordingSender,
}

impl FailingSender {
    /// Reject every batch with a retriable sink error.
    pub fn new() -> Self {
        Self::failing_first(usize::MAX)
    }

    /// Reject the first `failures` batches, then record like [`RecordingSender`].
    pub fn failing_first(failures: usize) -> Self {
        Self {
            error: sink_unavailable_error(),
            remaining_failures: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
            delivered: RecordingSender::new(),
        }
    }

    /// Use `error` for rejections.
    #[must_use]
    pub fn with_error(mut self, error: ErrorEnvelope) -> Self {
        self.error = error;
        self
    }

    /// Number of `send_batch` calls so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Batches accepted after the failures ran out.
    pub fn delivered(&self) -> Vec<MetricBatch> {
        self.delivered.batches()
    }
}

impl Default for FailingSender {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricBatchSenderPort for FailingSender {
    fn send_batch(&self, batch: MetricBatch) -> BoxFuture<'_, Result<()>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            let error = self.error.clone();
            return Box::pin(async move { Err(error) });
        }
        self.delivered.record(batch);
        Box::pin(async { Ok(()) })
    }
}

/// Sender that parks each batch until the test opens the gate.
#[derive(Debug)]
pub struct GatedSender {
    permits: Semaphore,
    entered: Notify,
    delivered: RecordingSender,
}

impl GatedSender {
    /// Create with the gate closed.
    pub fn new() -> Self {
        Self {
            permits: Semaphore::new(0),
            entered: Notify::new(),
            delivered: RecordingSender::new(),
        }
    }

    /// Let one parked batch through.
    pub fn open(&self) {
        self.permits.add_permits(1);
    }

    /// Wait until a batch has reached the sender.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Batches let through so far.
    pub fn delivered(&self) -> Vec<MetricBatch> {
        self.delivered.batches()
    }
}

impl Default for GatedSender {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricBatchSenderPort for GatedSender {
    fn send_batch(&self, batch: MetricBatch) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.entered.notify_one();
            let permit = self.permits.acquire().await.map_err(|_| {
                ErrorEnvelope::expected(ErrorCode::internal(), "sender gate closed")
            })?;
            permit.forget();
            self.delivered.record(batch);
            Ok(())
        })
    }
}

/// Registry holding caller-supplied metrics.
///
/// Listener callbacks run on the caller's thread after the registry lock is
/// released.
#[derive(Default)]
pub struct FakeRegistry {
    metrics: Mutex<RegistrySnapshot>,
    listeners: Mutex<BTreeMap<ListenerId, Arc<dyn RegistryListener>>>,
    next_id: AtomicU64,
}

impl FakeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of subscribed listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    /// Register or replace a counter.
    pub fn add_counter(&self, name: &str, counter: Arc<dyn CounterMetric>) {
        self.metrics
            .lock()
            .unwrap()
            .counters
            .insert(name.into(), Arc::clone(&counter));
        for listener in self.listeners() {
            listener.on_counter_added(name, &counter);
        }
    }

    /// Register or replace a gauge.
    pub fn add_gauge(&self, name: &str, gauge: Arc<dyn GaugeMetric>) {
        self.metrics
            .lock()
            .unwrap()
            .gauges
            .insert(name.into(), Arc::clone(&gauge));
        for listener in self.listeners() {
            listener.on_gauge_added(name, &gauge);
        }
    }

    /// Register or replace a histogram.
    pub fn add_histogram(&self, name: &str, histogram: Arc<dyn HistogramMetric>) {
        self.metrics
            .lock()
            .unwrap()
            .histograms
            .insert(name.into(), Arc::clone(&histogram));
        for listener in self.listeners() {
            listener.on_histogram_added(name, &histogram);
        }
    }

    /// Register or replace a meter.
    pub fn add_meter(&self, name: &str, meter: Arc<dyn MeterMetric>) {
        self.metrics
            .lock()
            .unwrap()
            .meters
            .insert(name.into(), Arc::clone(&meter));
        for listener in self.listeners() {
            listener.on_meter_added(name, &meter);
        }
    }

    /// Register or replace a timer.
    pub fn add_timer(&self, name: &str, timer: Arc<dyn TimerMetric>) {
        self.metrics
            .lock()
            .unwrap()
            .timers
            .insert(name.into(), Arc::clone(&timer));
        for listener in self.listeners() {
            listener.on_timer_added(name, &timer);
        }
    }

    /// Remove a counter, notifying listeners when it existed.
    pub fn remove_counter(&self, name: &str) -> bool {
        let removed = self.metrics.lock().unwrap().counters.remove(name).is_some();
        if removed {
            for listener in self.listeners() {
                listener.on_counter_removed(name);
            }
        }
        removed
    }

    /// Remove a gauge, notifying listeners when it existed.
    pub fn remove_gauge(&self, name: &str) -> bool {
        let removed = self.metrics.lock().unwrap().gauges.remove(name).is_some();
        if removed {
            for listener in self.listeners() {
                listener.on_gauge_removed(name);
            }
        }
        removed
    }

    /// Remove a histogram, notifying listeners when it existed.
    pub fn remove_histogram(&self, name: &str) -> bool {
        let removed = self.metrics.lock().unwrap().histograms.remove(name).is_some();
        if removed {
            for listener in self.listeners() {
                listener.on_histogram_removed(name);
            }
        }
        removed
    }

    /// Remove a meter, notifying listeners when it existed.
    pub fn remove_meter(&self, name: &str) -> bool {
        let removed = self.metrics.lock().unwrap().meters.remove(name).is_some();
        if removed {
            for listener in self.listeners() {
                listener.on_meter_removed(name);
            }
        }
        removed
    }

    /// Remove a timer, notifying listeners when it existed.
    pub fn remove_timer(&self, name: &str) -> bool {
        let removed = self.metrics.lock().unwrap().timers.remove(name).is_some();
        if removed {
            for listener in self.listeners() {
                listener.on_timer_removed(name);
            }
        }
        removed
    }

    fn listeners(&self) -> Vec<Arc<dyn RegistryListener>> {
        self.listeners.lock().unwrap().values().cloned().collect()
    }
}

impl MetricRegistryPort for FakeRegistry {
    fn snapshot(&self) -> RegistrySnapshot {
        self.metrics.lock().unwrap().clone()
    }

    fn add_listener(&self, listener: Arc<dyn RegistryListener>) -> ListenerId {
        let id = ListenerId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.listeners.lock().unwrap().insert(id, listener);
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.lock().unwrap().remove(&id).is_some()
    }
}
