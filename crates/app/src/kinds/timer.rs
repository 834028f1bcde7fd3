//! Timers to duration distributions, call rates, and call-count deltas.

use super::{MetricTransformer, TransformerDeps, forget_removed};
use crate::customizer::{Customizers, MetricIdentity};
use crate::delta::DeltaCounter;
use crate::distribution::DistributionTransformer;
use crate::rates::RateTransformer;
use metrics_export_domain::{EmittedMetric, HarvestInterval, MetricKind};
use metrics_export_ports::{MetricRef, RegistryListener, TimerMetric};
use std::collections::HashSet;

/// Emits a duration distribution, rate gauges, and a count delta per timer.
pub struct TimerTransformer {
    deps: TransformerDeps,
    durations: DistributionTransformer,
    rates: RateTransformer,
    counting: DeltaCounter,
}

impl TimerTransformer {
    /// `durations` should scale nanoseconds to the reporting duration unit.
    pub fn new(
        deps: TransformerDeps,
        durations: DistributionTransformer,
        rates: RateTransformer,
    ) -> Self {
        Self {
            deps,
            durations,
            rates,
            counting: DeltaCounter::new(),
        }
    }

    /// Delta state keyed by customized name.
    pub const fn counting(&self) -> &DeltaCounter {
        &self.counting
    }
}

impl MetricTransformer for TimerTransformer {
    type Metric = dyn TimerMetric;

    const KIND: MetricKind = MetricKind::Timer;

    fn metric_ref(metric: &Self::Metric) -> MetricRef<'_> {
        MetricRef::Timer(metric)
    }

    fn customizers(&self) -> &Customizers {
        &self.deps.customizers
    }

    fn emit(
        &self,
        identity: MetricIdentity,
        metric: &Self::Metric,
        interval: HarvestInterval,
    ) -> HashSet<EmittedMetric> {
        let snapshot = metric.snapshot();
        let mut metrics: HashSet<EmittedMetric> = self
            .durations
            .transform(&identity.name, snapshot.as_ref(), interval, &identity.attributes)
            .into_iter()
            .collect();
        metrics.extend(self.rates.transform(
            &identity.name,
            metric,
            interval.end_ms(),
            &identity.attributes,
        ));
        metrics.insert(self.counting.transform(
            &identity.name,
            metric.count(),
            interval,
            identity.attributes,
        ));
        metrics
    }

    fn remove(&self, name: &str) {
        forget_removed(&self.deps, &self.counting, Self::KIND, name);
    }

    fn delta_state(&self) -> Option<&DeltaCounter> {
        Some(&self.counting)
    }
}

impl RegistryListener for TimerTransformer {
    fn on_timer_removed(&self, name: &str) {
        self.remove(name);
    }
}
