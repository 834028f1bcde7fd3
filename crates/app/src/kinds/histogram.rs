//! Histograms to summaries, percentiles, and update-count deltas.

use super::{MetricTransformer, TransformerDeps, forget_removed};
use crate::customizer::{Customizers, MetricIdentity};
use crate::delta::DeltaCounter;
use crate::distribution::DistributionTransformer;
use metrics_export_domain::{EmittedMetric, HarvestInterval, MetricKind};
use metrics_export_ports::{HistogramMetric, MetricRef, RegistryListener};
use std::collections::HashSet;

/// Emits a distribution plus a count delta per histogram.
pub struct HistogramTransformer {
    deps: TransformerDeps,
    distribution: DistributionTransformer,
    counting: DeltaCounter,
}

impl HistogramTransformer {
    /// Create a transformer with empty delta state.
    pub fn new(deps: TransformerDeps, distribution: DistributionTransformer) -> Self {
        Self {
            deps,
            distribution,
            counting: DeltaCounter::new(),
        }
    }

    /// Delta state keyed by customized name.
    pub const fn counting(&self) -> &DeltaCounter {
        &self.counting
    }
}

impl MetricTransformer for HistogramTransformer {
    type Metric = dyn HistogramMetric;

    const KIND: MetricKind = MetricKind::Histogram;

    fn metric_ref(metric: &Self::Metric) -> MetricRef<'_> {
        MetricRef::Histogram(metric)
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
            .distribution
            .transform(&identity.name, snapshot.as_ref(), interval, &identity.attributes)
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

impl RegistryListener for HistogramTransformer {
    fn on_histogram_removed(&self, name: &str) {
        self.remove(name);
    }
}
