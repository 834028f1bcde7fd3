//! Meters to rate gauges and mark-count deltas.

use super::{MetricTransformer, TransformerDeps, forget_removed};
use crate::customizer::{Customizers, MetricIdentity};
use crate::delta::DeltaCounter;
use crate::rates::RateTransformer;
use metrics_export_domain::{EmittedMetric, HarvestInterval, MetricKind};
use metrics_export_ports::{MeterMetric, MetricRef, RegistryListener};
use std::collections::HashSet;

/// Emits enabled rate gauges plus a count delta per meter.
pub struct MeterTransformer {
    deps: TransformerDeps,
    rates: RateTransformer,
    counting: DeltaCounter,
}

impl MeterTransformer {
    /// Create a transformer with empty delta state.
    pub fn new(deps: TransformerDeps, rates: RateTransformer) -> Self {
        Self {
            deps,
            rates,
            counting: DeltaCounter::new(),
        }
    }

    /// Delta state keyed by customized name.
    pub const fn counting(&self) -> &DeltaCounter {
        &self.counting
    }
}

impl MetricTransformer for MeterTransformer {
    type Metric = dyn MeterMetric;

    const KIND: MetricKind = MetricKind::Meter;

    fn metric_ref(metric: &Self::Metric) -> MetricRef<'_> {
        MetricRef::Meter(metric)
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
        let mut metrics: HashSet<EmittedMetric> = self
            .rates
            .transform(&identity.name, metric, interval.end_ms(), &identity.attributes)
            .into_iter()
            .collect();
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

impl RegistryListener for MeterTransformer {
    fn on_meter_removed(&self, name: &str) {
        self.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_export_testkit::FixedMeter;

    #[test]
    fn emits_scaled_rates_and_count() {
        let transformer =
            MeterTransformer::new(TransformerDeps::default(), RateTransformer::all_windows(10.0));
        let meter = FixedMeter::new(12, [100.0, 200.0, 300.0, 400.0]);
        let metrics = transformer
            .transform("orders", &meter, HarvestInterval::new(0, 7))
            .unwrap_or_default();

        let mut rates: Vec<f64> = metrics
            .iter()
            .filter(|metric| metric.name() == "orders.rates")
            .filter_map(EmittedMetric::value)
            .collect();
        rates.sort_by(f64::total_cmp);

        assert_eq!(rates, vec![1_000.0, 2_000.0, 3_000.0, 4_000.0]);
        assert!(metrics.iter().any(|metric| matches!(
            metric,
            EmittedMetric::Count { interval_end_ms: 7, .. }
        ) && metric.value() == Some(12.0)));
    }

    #[test]
    fn meter_removal_clears_state() {
        let transformer =
            MeterTransformer::new(TransformerDeps::default(), RateTransformer::all_windows(1.0));
        let _ = transformer.transform(
            "orders",
            &FixedMeter::new(3, [0.0; 4]),
            HarvestInterval::new(0, 1),
        );

        transformer.on_meter_removed("orders");
        assert!(transformer.counting().is_empty());
    }
}
