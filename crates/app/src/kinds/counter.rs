//! Counters to interval deltas.

use super::{MetricTransformer, TransformerDeps, forget_removed};
use crate::customizer::{Customizers, MetricIdentity};
use crate::delta::DeltaCounter;
use metrics_export_domain::{EmittedMetric, HarvestInterval, MetricKind};
use metrics_export_ports::{CounterMetric, MetricRef, RegistryListener};
use std::collections::HashSet;

/// Emits one count delta per counter.
pub struct CounterTransformer {
    deps: TransformerDeps,
    counting: DeltaCounter,
}

impl CounterTransformer {
    /// Create a transformer with empty delta state.
    pub fn new(deps: TransformerDeps) -> Self {
        Self {
            deps,
            counting: DeltaCounter::new(),
        }
    }

    /// Delta state keyed by customized name.
    pub const fn counting(&self) -> &DeltaCounter {
        &self.counting
    }
}

impl MetricTransformer for CounterTransformer {
    type Metric = dyn CounterMetric;

    const KIND: MetricKind = MetricKind::Counter;

    fn metric_ref(metric: &Self::Metric) -> MetricRef<'_> {
        MetricRef::Counter(metric)
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
        HashSet::from([self.counting.transform(
            &identity.name,
            metric.count(),
            interval,
            identity.attributes,
        )])
    }

    fn remove(&self, name: &str) {
        forget_removed(&self.deps, &self.counting, Self::KIND, name);
    }

    fn delta_state(&self) -> Option<&DeltaCounter> {
        Some(&self.counting)
    }
}

impl RegistryListener for CounterTransformer {
    fn on_counter_removed(&self, name: &str) {
        self.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_export_testkit::FixedCounter;

    fn deltas(transformer: &CounterTransformer, counter: &FixedCounter) -> Vec<f64> {
        transformer
            .transform("requests", counter, HarvestInterval::new(0, 1))
            .unwrap_or_default()
            .iter()
            .filter_map(EmittedMetric::value)
            .collect()
    }

    #[test]
    fn decrement_after_first_harvest_takes_reset_path() {
        let transformer = CounterTransformer::new(TransformerDeps::default());
        let counter = FixedCounter::new(44);

        assert_eq!(deltas(&transformer, &counter), vec![44.0]);
        counter.set(30);
        assert_eq!(deltas(&transformer, &counter), vec![30.0]);
    }

    #[test]
    fn registry_removal_clears_state() {
        let transformer = CounterTransformer::new(TransformerDeps::default());
        let counter = FixedCounter::new(10);
        let _ = deltas(&transformer, &counter);

        transformer.on_counter_removed("requests");
        assert!(transformer.counting().is_empty());
        assert_eq!(deltas(&transformer, &counter), vec![10.0]);
    }

    #[test]
    fn other_kind_removals_are_ignored() {
        let transformer = CounterTransformer::new(TransformerDeps::default());
        let _ = deltas(&transformer, &FixedCounter::new(1));

        transformer.on_meter_removed("requests");
        assert_eq!(transformer.counting().len(), 1);
    }
}
