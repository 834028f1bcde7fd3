//! Harvest coordination.
//!
//! One harvest snapshots the registry, runs every entry through its kind
//! transformer, sends the deduplicated batch, and only then advances the
//! interval clock. A failed send leaves the clock untouched so the next
//! harvest re-covers the interval.

use crate::distribution::DistributionTransformer;
use crate::filter::{AllowAll, MetricFilter};
use crate::interval::IntervalClock;
use crate::kinds::{
    CounterTransformer, GaugeTransformer, HistogramTransformer, MeterTransformer,
    MetricTransformer, TimerTransformer, TransformerDeps,
};
use crate::rates::RateTransformer;
use metrics_export_core::{
    PROVIDER_ATTRIBUTE, PROVIDER_NAME, VERSION_ATTRIBUTE, implementation_version,
};
use metrics_export_domain::{Attributes, EmittedMetric, HarvestInterval, MetricBatch, MetricKind};
use metrics_export_ports::{
    ClockPort, ListenerId, LogFields, LoggerPort, MetricBatchSenderPort, MetricMap,
    MetricRegistryPort,
};
use metrics_export_shared::{ErrorCode, ErrorEnvelope, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Collaborators of a coordinator.
#[derive(Clone)]
pub struct HarvestCoordinatorDeps {
    /// Live metric registry.
    pub registry: Arc<dyn MetricRegistryPort>,
    /// Batch sender.
    pub sender: Arc<dyn MetricBatchSenderPort>,
    /// Wall clock.
    pub clock: Arc<dyn ClockPort>,
    /// Optional logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
}

/// One transformer per metric kind.
#[derive(Clone)]
pub struct KindTransformers {
    /// Counter transformer.
    pub counter: Arc<CounterTransformer>,
    /// Gauge transformer.
    pub gauge: Arc<GaugeTransformer>,
    /// Histogram transformer.
    pub histogram: Arc<HistogramTransformer>,
    /// Meter transformer.
    pub meter: Arc<MeterTransformer>,
    /// Timer transformer.
    pub timer: Arc<TimerTransformer>,
}

impl KindTransformers {
    /// Wire all five kinds; histograms are reported unscaled.
    pub fn new(
        deps: &TransformerDeps,
        rates: &RateTransformer,
        durations: DistributionTransformer,
    ) -> Self {
        Self {
            counter: Arc::new(CounterTransformer::new(deps.clone())),
            gauge: Arc::new(GaugeTransformer::new(deps.clone())),
            histogram: Arc::new(HistogramTransformer::new(
                deps.clone(),
                DistributionTransformer::unscaled(),
            )),
            meter: Arc::new(MeterTransformer::new(deps.clone(), rates.clone())),
            timer: Arc::new(TimerTransformer::new(deps.clone(), durations, rates.clone())),
        }
    }
}

/// Static coordinator settings, read once at construction.
#[derive(Clone)]
pub struct HarvestCoordinatorOptions {
    /// Reporter name used in logs.
    pub name: Box<str>,
    /// Attributes attached to every batch.
    pub common_attributes: Attributes,
    /// Registry entry filter.
    pub filter: Arc<dyn MetricFilter>,
}

impl Default for HarvestCoordinatorOptions {
    fn default() -> Self {
        Self {
            name: PROVIDER_NAME.into(),
            common_attributes: Attributes::new(),
            filter: Arc::new(AllowAll),
        }
    }
}

/// Outcome of one successful hand-off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestReport {
    /// Distinct metrics in the sent batch.
    pub metric_count: usize,
    /// Kinds dropped from this batch because a customizer failed.
    pub failed_kinds: Vec<MetricKind>,
    /// Interval start.
    pub interval_start_ms: u64,
    /// Interval end.
    pub interval_end_ms: u64,
}

impl HarvestReport {
    /// Returns true when at least one kind was dropped.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.failed_kinds.is_empty()
    }
}

/// Harvest state of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestState {
    /// Between harvests.
    Idle,
    /// A harvest is running.
    Harvesting,
}

struct HarvestPermit<'a>(&'a AtomicBool);

impl Drop for HarvestPermit<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives harvests and registry subscriptions for the five kind transformers.
pub struct HarvestCoordinator {
    deps: HarvestCoordinatorDeps,
    transformers: KindTransformers,
    name: Box<str>,
    filter: Arc<dyn MetricFilter>,
    batch_attributes: Attributes,
    interval_clock: IntervalClock,
    harvesting: AtomicBool,
    listeners: Mutex<Option<Vec<ListenerId>>>,
}

impl HarvestCoordinator {
    /// Build an idle, unstarted coordinator. The first interval starts now.
    pub fn new(
        deps: HarvestCoordinatorDeps,
        transformers: KindTransformers,
        options: HarvestCoordinatorOptions,
    ) -> Self {
        let batch_attributes = options
            .common_attributes
            .with(PROVIDER_ATTRIBUTE, PROVIDER_NAME)
            .with(VERSION_ATTRIBUTE, implementation_version());
        let interval_clock = IntervalClock::new(Arc::clone(&deps.clock));
        Self {
            deps,
            transformers,
            name: options.name,
            filter: options.filter,
            batch_attributes,
            interval_clock,
            harvesting: AtomicBool::new(false),
            listeners: Mutex::new(None),
        }
    }

    /// Reporter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes attached to every batch.
    pub const fn batch_attributes(&self) -> &Attributes {
        &self.batch_attributes
    }

    /// Interval tracking for this coordinator.
    pub const fn interval_clock(&self) -> &IntervalClock {
        &self.interval_clock
    }

    /// The kind transformers.
    pub const fn transformers(&self) -> &KindTransformers {
        &self.transformers
    }

    /// Current harvest state.
    pub fn state(&self) -> HarvestState {
        if self.harvesting.load(Ordering::Acquire) {
            HarvestState::Harvesting
        } else {
            HarvestState::Idle
        }
    }

    /// Returns true while subscribed to the registry.
    pub fn is_started(&self) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Subscribe all kind transformers to registry removals.
    ///
    /// Returns false when already started.
    pub fn start(&self) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        if listeners.is_some() {
            return false;
        }
        let registry = &self.deps.registry;
        *listeners = Some(vec![
            registry.add_listener(self.transformers.counter.clone()),
            registry.add_listener(self.transformers.gauge.clone()),
            registry.add_listener(self.transformers.histogram.clone()),
            registry.add_listener(self.transformers.meter.clone()),
            registry.add_listener(self.transformers.timer.clone()),
        ]);
        drop(listeners);

        if let Some(logger) = self.deps.logger.as_ref() {
            logger.info(
                "exporter.started",
                "Metric exporter started",
                Some(log_fields_lifecycle(&self.name)),
            );
        }
        true
    }

    /// Unsubscribe all kind transformers. Returns false when not started.
    pub fn stop(&self) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(ids) = listeners.take() else {
            return false;
        };
        for id in ids {
            self.deps.registry.remove_listener(id);
        }
        drop(listeners);

        if let Some(logger) = self.deps.logger.as_ref() {
            logger.info(
                "exporter.stopped",
                "Metric exporter stopped",
                Some(log_fields_lifecycle(&self.name)),
            );
        }
        true
    }

    /// Run one harvest.
    ///
    /// Fails with `harvest:in_progress` when another harvest is running and
    /// with `harvest:send_failed` when the sender rejects the batch. A kind
    /// whose customizer fails is left out of the batch and listed in the
    /// report.
    pub async fn harvest(&self) -> Result<HarvestReport> {
        let Some(_permit) = self.enter() else {
            return Err(ErrorEnvelope::expected(
                ErrorCode::harvest_in_progress(),
                "a harvest is already running",
            )
            .with_metadata("reporter", self.name.to_string()));
        };
        let started_at = Instant::now();
        let interval = self.interval_clock.interval();
        self.begin_sweep();
        let snapshot = self.deps.registry.snapshot();

        let mut batch = MetricBatch::new(self.batch_attributes.clone());
        let mut failed_kinds = Vec::new();
        let transformers = &self.transformers;
        self.collect(
            transformers.counter.as_ref(),
            &snapshot.counters,
            interval,
            &mut batch,
            &mut failed_kinds,
        );
        self.collect(
            transformers.gauge.as_ref(),
            &snapshot.gauges,
            interval,
            &mut batch,
            &mut failed_kinds,
        );
        self.collect(
            transformers.histogram.as_ref(),
            &snapshot.histograms,
            interval,
            &mut batch,
            &mut failed_kinds,
        );
        self.collect(
            transformers.meter.as_ref(),
            &snapshot.meters,
            interval,
            &mut batch,
            &mut failed_kinds,
        );
        self.collect(
            transformers.timer.as_ref(),
            &snapshot.timers,
            interval,
            &mut batch,
            &mut failed_kinds,
        );
        drop(snapshot);

        let metric_count = batch.len();
        if let Err(error) = self.deps.sender.send_batch(batch).await {
            let error = send_failed(error, metric_count);
            if let Some(logger) = self.deps.logger.as_ref() {
                logger.error(
                    "harvest.send_failed",
                    "Batch sender failed; interval not advanced",
                    Some(log_fields_send_failed(&self.name, metric_count, &error)),
                );
            }
            return Err(error);
        }
        self.interval_clock.advance();

        let report = HarvestReport {
            metric_count,
            failed_kinds,
            interval_start_ms: interval.start_ms(),
            interval_end_ms: interval.end_ms(),
        };
        if let Some(logger) = self.deps.logger.as_ref() {
            logger.info(
                "harvest.completed",
                "Harvest completed",
                Some(log_fields_completed(&self.name, &report, started_at)),
            );
        }
        Ok(report)
    }

    fn enter(&self) -> Option<HarvestPermit<'_>> {
        self.harvesting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| HarvestPermit(&self.harvesting))
    }

    fn begin_sweep(&self) {
        let transformers = &self.transformers;
        for counting in [
            transformers.counter.counting(),
            transformers.histogram.counting(),
            transformers.meter.counting(),
            transformers.timer.counting(),
        ] {
            counting.begin_sweep();
        }
    }

    fn collect<T: MetricTransformer>(
        &self,
        transformer: &T,
        metrics: &MetricMap<T::Metric>,
        interval: HarvestInterval,
        batch: &mut MetricBatch,
        failed_kinds: &mut Vec<MetricKind>,
    ) {
        match self.transform_kind(transformer, metrics, interval) {
            Ok(emitted) => batch.extend(emitted),
            Err(error) => {
                if let Some(logger) = self.deps.logger.as_ref() {
                    logger.warn(
                        "harvest.kind_failed",
                        "Metric kind skipped for this harvest",
                        Some(log_fields_kind_failed(&self.name, T::KIND, &error)),
                    );
                }
                failed_kinds.push(T::KIND);
            },
        }
    }

    // Customize every entry before emitting any, so a failing kind leaves
    // its delta state untouched. Delta state is then pruned to the names this
    // harvest emitted, minus any removed while it ran.
    fn transform_kind<T: MetricTransformer>(
        &self,
        transformer: &T,
        metrics: &MetricMap<T::Metric>,
        interval: HarvestInterval,
    ) -> Result<Vec<EmittedMetric>> {
        let mut identified = Vec::with_capacity(metrics.len());
        for (name, metric) in metrics {
            if !self.filter.matches(name, T::metric_ref(metric)) {
                continue;
            }
            identified.push((transformer.identify(name, metric)?, metric));
        }
        let live: HashSet<Box<str>> = identified
            .iter()
            .map(|(identity, _)| identity.name.clone())
            .collect();
        let emitted = identified
            .into_iter()
            .flat_map(|(identity, metric)| transformer.emit(identity, metric, interval))
            .collect();
        if let Some(counting) = transformer.delta_state() {
            counting.retain_names(&live);
        }
        Ok(emitted)
    }
}

impl fmt::Debug for HarvestCoordinator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HarvestCoordinator")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

fn send_failed(cause: ErrorEnvelope, metric_count: usize) -> ErrorEnvelope {
    let mut error =
        ErrorEnvelope::unexpected(ErrorCode::harvest_send_failed(), cause.message, cause.class)
            .with_metadata("cause", cause.code.to_string())
            .with_metadata("metricCount", metric_count.to_string());
    for (key, value) in cause.metadata {
        error.metadata.entry(key).or_insert(value);
    }
    error
}

fn duration_ms(started_at: Instant) -> u64 {
    u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn log_fields_lifecycle(name: &str) -> LogFields {
    let mut fields = LogFields::new();
    fields.insert("reporter".into(), Value::String(name.to_owned()));
    fields.insert("provider".into(), Value::String(PROVIDER_NAME.to_owned()));
    fields.insert(
        "version".into(),
        Value::String(implementation_version().to_owned()),
    );
    fields
}

fn log_fields_completed(name: &str, report: &HarvestReport, started_at: Instant) -> LogFields {
    let mut fields = LogFields::new();
    fields.insert("reporter".into(), Value::String(name.to_owned()));
    fields.insert("metricCount".into(), Value::from(report.metric_count));
    fields.insert("intervalStartMs".into(), Value::from(report.interval_start_ms));
    fields.insert("intervalEndMs".into(), Value::from(report.interval_end_ms));
    fields.insert("durationMs".into(), Value::from(duration_ms(started_at)));
    if report.is_partial() {
        fields.insert(
            "failedKinds".into(),
            Value::from(
                report
                    .failed_kinds
                    .iter()
                    .map(|kind| kind.as_str())
                    .collect::<Vec<_>>(),
            ),
        );
    }
    fields
}

fn log_fields_kind_failed(name: &str, kind: MetricKind, error: &ErrorEnvelope) -> LogFields {
    let mut fields = LogFields::new();
    fields.insert("reporter".into(), Value::String(name.to_owned()));
    fields.insert("kind".into(), Value::String(kind.as_str().to_owned()));
    fields.insert("error".into(), Value::String(error.to_string()));
    if let Some(metric) = error.metadata.get("metric") {
        fields.insert("metric".into(), Value::String(metric.clone()));
    }
    fields
}

fn log_fields_send_failed(name: &str, metric_count: usize, error: &ErrorEnvelope) -> LogFields {
    let mut fields = LogFields::new();
    fields.insert("reporter".into(), Value::String(name.to_owned()));
    fields.insert("metricCount".into(), Value::from(metric_count));
    fields.insert("error".into(), Value::String(error.to_string()));
    fields.insert("retriable".into(), Value::Bool(error.class.is_retriable()));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_export_ports::RegistryListener;
    use metrics_export_testkit::{
        FakeRegistry, FailingSender, FixedCounter, ManualClock, RecordingLogger, RecordingSender,
    };

    struct Fixture {
        registry: Arc<FakeRegistry>,
        sender: Arc<RecordingSender>,
        clock: Arc<ManualClock>,
        logger: Arc<RecordingLogger>,
        coordinator: HarvestCoordinator,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(FakeRegistry::new());
        let sender = Arc::new(RecordingSender::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let logger = Arc::new(RecordingLogger::default());
        let deps = HarvestCoordinatorDeps {
            registry: registry.clone(),
            sender: sender.clone(),
            clock: clock.clone(),
            logger: Some(logger.clone()),
        };
        let transformer_deps = TransformerDeps::default();
        let coordinator = HarvestCoordinator::new(
            deps,
            KindTransformers::new(
                &transformer_deps,
                &RateTransformer::all_windows(1.0),
                DistributionTransformer::unscaled(),
            ),
            HarvestCoordinatorOptions {
                common_attributes: Attributes::new().with("host", "web-1"),
                ..HarvestCoordinatorOptions::default()
            },
        );
        Fixture {
            registry,
            sender,
            clock,
            logger,
            coordinator,
        }
    }

    #[test]
    fn batch_attributes_include_identity() {
        let fixture = fixture();
        let attributes = fixture.coordinator.batch_attributes();

        assert_eq!(
            attributes.get(PROVIDER_ATTRIBUTE).and_then(|value| value.as_str()),
            Some(PROVIDER_NAME)
        );
        assert_eq!(
            attributes.get(VERSION_ATTRIBUTE).and_then(|value| value.as_str()),
            Some(implementation_version())
        );
        assert_eq!(
            attributes.get("host").and_then(|value| value.as_str()),
            Some("web-1")
        );
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let fixture = fixture();

        assert!(fixture.coordinator.start());
        assert!(!fixture.coordinator.start());
        assert_eq!(fixture.registry.listener_count(), 5);
        assert!(fixture.coordinator.is_started());

        assert!(fixture.coordinator.stop());
        assert!(!fixture.coordinator.stop());
        assert_eq!(fixture.registry.listener_count(), 0);
        assert_eq!(
            fixture.logger.event_names(),
            vec!["exporter.started".to_string(), "exporter.stopped".to_string()]
        );
    }

    #[tokio::test]
    async fn harvest_sends_then_advances_clock() {
        let fixture = fixture();
        fixture
            .registry
            .add_counter("requests", Arc::new(FixedCounter::new(3)));
        fixture.clock.set_ms(6_000);

        let report = fixture
            .coordinator
            .harvest()
            .await
            .unwrap_or_else(|error| unreachable!("{error}"));

        assert_eq!(report.metric_count, 1);
        assert_eq!(report.interval_start_ms, 1_000);
        assert_eq!(report.interval_end_ms, 6_000);
        assert_eq!(fixture.coordinator.interval_clock().previous_ms(), 6_000);
        assert_eq!(fixture.sender.batches().len(), 1);
        assert_eq!(fixture.coordinator.state(), HarvestState::Idle);
    }

    #[tokio::test]
    async fn failed_send_keeps_the_interval_open() {
        let registry = Arc::new(FakeRegistry::new());
        let clock = Arc::new(ManualClock::new(0));
        let coordinator = HarvestCoordinator::new(
            HarvestCoordinatorDeps {
                registry: registry.clone(),
                sender: Arc::new(FailingSender::new()),
                clock: clock.clone(),
                logger: None,
            },
            KindTransformers::new(
                &TransformerDeps::default(),
                &RateTransformer::all_windows(1.0),
                DistributionTransformer::unscaled(),
            ),
            HarvestCoordinatorOptions::default(),
        );
        registry.add_counter("requests", Arc::new(FixedCounter::new(1)));
        clock.set_ms(5_000);

        let error = coordinator.harvest().await.err();

        assert!(error.is_some_and(|error| error.has_code(&ErrorCode::harvest_send_failed())));
        assert_eq!(coordinator.interval_clock().previous_ms(), 0);
        assert_eq!(coordinator.state(), HarvestState::Idle);
    }

    #[test]
    fn removal_events_reach_transformers_only_while_started() {
        let fixture = fixture();
        fixture.coordinator.transformers().counter.counting().observe("requests", 9);

        fixture.registry.add_counter("requests", Arc::new(FixedCounter::new(9)));
        fixture.registry.remove_counter("requests");
        assert_eq!(fixture.coordinator.transformers().counter.counting().len(), 1);

        fixture.coordinator.start();
        fixture.registry.add_counter("requests", Arc::new(FixedCounter::new(9)));
        fixture.registry.remove_counter("requests");
        assert!(fixture.coordinator.transformers().counter.counting().is_empty());
    }

    struct SelfRemovingCounter {
        registry: Arc<FakeRegistry>,
        count: i64,
    }

    impl metrics_export_ports::Counting for SelfRemovingCounter {
        fn count(&self) -> i64 {
            self.registry.remove_counter("jobs");
            self.count
        }
    }

    impl metrics_export_ports::CounterMetric for SelfRemovingCounter {}

    #[tokio::test]
    async fn removal_during_harvest_does_not_leave_delta_state() {
        let fixture = fixture();
        fixture.coordinator.start();
        fixture
            .registry
            .add_counter("requests", Arc::new(FixedCounter::new(2)));
        fixture.registry.add_counter(
            "jobs",
            Arc::new(SelfRemovingCounter {
                registry: fixture.registry.clone(),
                count: 7,
            }),
        );

        let report = fixture.coordinator.harvest().await;
        assert!(report.is_ok_and(|report| report.metric_count == 2));

        let counting = fixture.coordinator.transformers().counter.counting();
        assert_eq!(counting.last_count("jobs"), None);
        assert_eq!(counting.last_count("requests"), Some(2));

        fixture
            .registry
            .add_counter("jobs", Arc::new(FixedCounter::new(9)));
        fixture.clock.advance_ms(5_000);
        let _ = fixture.coordinator.harvest().await;
        let batch = fixture.sender.last().unwrap_or_default();
        let jobs: Vec<f64> = batch
            .iter()
            .filter(|metric| metric.name() == "jobs")
            .filter_map(EmittedMetric::value)
            .collect();
        assert_eq!(jobs, vec![9.0]);
    }

    #[tokio::test]
    async fn delta_state_follows_the_registry_between_harvests() {
        let fixture = fixture();
        fixture
            .registry
            .add_counter("requests", Arc::new(FixedCounter::new(2)));
        let _ = fixture.coordinator.harvest().await;

        // Not started, so the removal callback never reaches the transformer.
        fixture.registry.remove_counter("requests");
        let _ = fixture.coordinator.harvest().await;

        assert!(fixture.coordinator.transformers().counter.counting().is_empty());
    }

    #[test]
    fn transformers_are_registry_listeners() {
        let fixture = fixture();
        let listener: Arc<dyn RegistryListener> = fixture.coordinator.transformers().meter.clone();
        listener.on_meter_removed("unknown");
        assert!(fixture.coordinator.transformers().meter.counting().is_empty());
    }
}
