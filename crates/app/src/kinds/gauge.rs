//! Gauges to point-in-time values.

use super::{MetricTransformer, TransformerDeps};
use crate::customizer::{Customizers, MetricIdentity};
use metrics_export_domain::{EmittedMetric, HarvestInterval, MetricKind};
use metrics_export_ports::{GaugeMetric, LogFields, MetricRef, RegistryListener};
use serde_json::Value;
use std::collections::HashSet;

/// Emits one gauge per numeric gauge value; absent and non-numeric values are skipped.
pub struct GaugeTransformer {
    deps: TransformerDeps,
}

impl GaugeTransformer {
    /// Create a stateless gauge transformer.
    pub const fn new(deps: TransformerDeps) -> Self {
        Self { deps }
    }
}

impl MetricTransformer for GaugeTransformer {
    type Metric = dyn GaugeMetric;

    const KIND: MetricKind = MetricKind::Gauge;

    fn metric_ref(metric: &Self::Metric) -> MetricRef<'_> {
        MetricRef::Gauge(metric)
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
        let value = metric.value();
        let Some(widened) = value.as_f64() else {
            if let Some(logger) = self.deps.logger.as_ref() {
                logger.debug(
                    "gauge.skipped",
                    "Gauge value is absent or not numeric",
                    Some(log_fields_skipped(&identity.name, value.type_label())),
                );
            }
            return HashSet::new();
        };
        HashSet::from([EmittedMetric::gauge(
            identity.name,
            widened,
            interval.end_ms(),
            identity.attributes,
        )])
    }

    fn remove(&self, _name: &str) {}
}

impl RegistryListener for GaugeTransformer {}

fn log_fields_skipped(name: &str, value_type: &str) -> LogFields {
    let mut fields = LogFields::new();
    fields.insert("metric".into(), Value::String(name.to_owned()));
    fields.insert("valueType".into(), Value::String(value_type.to_owned()));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_export_domain::GaugeValue;
    use metrics_export_testkit::{FixedGauge, RecordingLogger};
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn decimal() -> Decimal {
        Decimal::new(15, 1)
    }

    fn emitted(value: GaugeValue) -> HashSet<EmittedMetric> {
        GaugeTransformer::new(TransformerDeps::default())
            .transform("pool.size", &FixedGauge::new(value), HarvestInterval::new(0, 9))
            .unwrap_or_default()
    }

    #[test]
    fn numeric_values_emit_one_gauge() {
        for (value, expected) in [
            (GaugeValue::Integer(12), 12.0),
            (GaugeValue::Float(0.25), 0.25),
            (GaugeValue::Unsigned(3), 3.0),
            (GaugeValue::Decimal(decimal()), 1.5),
        ] {
            let metrics = emitted(value);
            assert_eq!(metrics.len(), 1);
            assert!(metrics.iter().all(|metric| metric.value() == Some(expected)));
            assert!(
                metrics
                    .iter()
                    .all(|metric| matches!(metric, EmittedMetric::Gauge { timestamp_ms: 9, .. }))
            );
        }
    }

    #[test]
    fn absent_and_non_numeric_values_emit_nothing() {
        assert!(emitted(GaugeValue::Absent).is_empty());
        assert!(emitted(GaugeValue::Text("warm".into())).is_empty());
        assert!(emitted(GaugeValue::Boolean(true)).is_empty());
    }

    #[test]
    fn skipped_gauges_are_logged_at_debug() {
        let logger = Arc::new(RecordingLogger::default());
        let transformer = GaugeTransformer::new(TransformerDeps {
            logger: Some(logger.clone()),
            ..TransformerDeps::default()
        });
        let _ = transformer.transform(
            "status",
            &FixedGauge::new(GaugeValue::Text("ok".into())),
            HarvestInterval::new(0, 1),
        );

        assert_eq!(logger.event_names(), vec!["gauge.skipped".to_string()]);
    }
}
