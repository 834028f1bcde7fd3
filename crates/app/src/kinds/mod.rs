//! Per-kind metric transformers.
//!
//! Each kind applies the customizers once per metric, composes the counting,
//! rate, and distribution primitives, and forgets per-metric state when the
//! registry removes a metric.

mod counter;
mod gauge;
mod histogram;
mod meter;
mod timer;

pub use counter::CounterTransformer;
pub use gauge::GaugeTransformer;
pub use histogram::HistogramTransformer;
pub use meter::MeterTransformer;
pub use timer::TimerTransformer;

use crate::customizer::{Customizers, MetricIdentity};
use crate::delta::DeltaCounter;
use metrics_export_domain::{EmittedMetric, HarvestInterval, MetricKind};
use metrics_export_ports::{LogFields, LoggerPort, MetricRef, RegistryListener};
use metrics_export_shared::Result;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Dependencies shared by every kind transformer.
#[derive(Clone, Default)]
pub struct TransformerDeps {
    /// Name and attribute customizers.
    pub customizers: Customizers,
    /// Optional logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
}

/// Transforms registry metrics of one kind into emitted metrics.
pub trait MetricTransformer: RegistryListener {
    /// Registry metric type handled by this transformer.
    type Metric: ?Sized + Send + Sync;

    /// Kind handled by this transformer.
    const KIND: MetricKind;

    /// Borrow `metric` as a kind-tagged reference.
    fn metric_ref(metric: &Self::Metric) -> MetricRef<'_>;

    /// Customizers applied by this transformer.
    fn customizers(&self) -> &Customizers;

    /// Build metrics for an already customized identity. Infallible.
    fn emit(
        &self,
        identity: MetricIdentity,
        metric: &Self::Metric,
        interval: HarvestInterval,
    ) -> HashSet<EmittedMetric>;

    /// Forget state for the metric registered as `name`.
    fn remove(&self, name: &str);

    /// Per-name delta state, for kinds that report counts.
    fn delta_state(&self) -> Option<&DeltaCounter> {
        None
    }

    /// Customize `name` once, then build its metrics.
    fn identify(&self, name: &str, metric: &Self::Metric) -> Result<MetricIdentity> {
        self.customizers().identify(name, Self::metric_ref(metric))
    }

    /// Customize and emit in one call.
    fn transform(
        &self,
        name: &str,
        metric: &Self::Metric,
        interval: HarvestInterval,
    ) -> Result<HashSet<EmittedMetric>> {
        let identity = self.identify(name, metric)?;
        Ok(self.emit(identity, metric, interval))
    }
}

/// Forward a removal to `counting` under the customized name.
///
/// Falls back to the registry name when the name customizer fails.
pub(crate) fn forget_removed(
    deps: &TransformerDeps,
    counting: &DeltaCounter,
    kind: MetricKind,
    name: &str,
) {
    match deps.customizers.name(name) {
        Ok(customized) => {
            counting.remove(&customized);
        },
        Err(error) => {
            if let Some(logger) = deps.logger.as_ref() {
                logger.warn(
                    "registry.remove_failed",
                    "Name customizer failed for a removed metric",
                    Some(log_fields_removal(kind, name, &error.to_string())),
                );
            }
            counting.remove(name);
        },
    }
}

fn log_fields_removal(kind: MetricKind, name: &str, error: &str) -> LogFields {
    let mut fields = LogFields::new();
    fields.insert("kind".into(), Value::String(kind.as_str().to_owned()));
    fields.insert("metric".into(), Value::String(name.to_owned()));
    fields.insert("error".into(), Value::String(error.to_owned()));
    fields
}
