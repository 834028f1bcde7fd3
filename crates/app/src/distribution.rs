//! Snapshots to summaries and percentile gauges.

use metrics_export_domain::{Attributes, EmittedMetric, HarvestInterval, Snapshot, SummaryValues};
use metrics_export_shared::{ErrorCode, ErrorEnvelope, Result};

/// Attribute key tagging each percentile gauge.
pub const PERCENTILE_ATTRIBUTE: &str = "percentile";

/// Extra attribute key on the median gauge.
pub const COMMON_NAME_ATTRIBUTE: &str = "commonName";

/// Suffix appended to the metric name of percentile gauges.
pub const PERCENTILES_SUFFIX: &str = ".percentiles";

/// One reported percentile: the quantile looked up and its 0-100 label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percentile {
    /// Quantile in `[0, 1]`.
    pub quantile: f64,
    /// Label in `[0, 100]`.
    pub label: f64,
    /// Optional `commonName` attribute.
    pub common_name: Option<&'static str>,
}

/// Percentiles reported for every distribution.
pub const PERCENTILES: [Percentile; 6] = [
    Percentile {
        quantile: 0.5,
        label: 50.0,
        common_name: Some("median"),
    },
    Percentile {
        quantile: 0.75,
        label: 75.0,
        common_name: None,
    },
    Percentile {
        quantile: 0.95,
        label: 95.0,
        common_name: None,
    },
    Percentile {
        quantile: 0.98,
        label: 98.0,
        common_name: None,
    },
    Percentile {
        quantile: 0.99,
        label: 99.0,
        common_name: None,
    },
    Percentile {
        quantile: 0.999,
        label: 99.9,
        common_name: None,
    },
];

/// Emits one summary plus [`PERCENTILES`] gauges per snapshot.
///
/// Every reported value except `sum` is divided by the scale factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistributionTransformer {
    scale_factor: f64,
}

impl DistributionTransformer {
    /// Divide reported values by `scale_factor` (must be finite and > 0).
    pub fn new(scale_factor: f64) -> Result<Self> {
        if !scale_factor.is_finite() || scale_factor <= 0.0 {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "distribution scale factor must be finite and positive",
            )
            .with_metadata("scaleFactor", scale_factor.to_string()));
        }
        Ok(Self { scale_factor })
    }

    /// Report raw values.
    #[must_use]
    pub const fn unscaled() -> Self {
        Self { scale_factor: 1.0 }
    }

    /// Divisor applied to reported values.
    #[must_use]
    pub const fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Summary over `interval` plus percentile gauges stamped at its end.
    pub fn transform(
        &self,
        name: &str,
        snapshot: &dyn Snapshot,
        interval: HarvestInterval,
        attributes: &Attributes,
    ) -> Vec<EmittedMetric> {
        let mut metrics = Vec::with_capacity(PERCENTILES.len() + 1);
        metrics.push(EmittedMetric::summary(
            name,
            SummaryValues {
                count: snapshot.size() as u64,
                sum: snapshot.sum(),
                min: snapshot.min() / self.scale_factor,
                max: snapshot.max() / self.scale_factor,
            },
            interval,
            attributes.clone(),
        ));

        let percentiles_name = format!("{name}{PERCENTILES_SUFFIX}");
        for percentile in PERCENTILES {
            let raw = if percentile.common_name == Some("median") {
                snapshot.median()
            } else {
                snapshot.value_at(percentile.quantile)
            };
            let mut percentile_attributes =
                attributes.clone().with(PERCENTILE_ATTRIBUTE, percentile.label);
            if let Some(common_name) = percentile.common_name {
                percentile_attributes.put(COMMON_NAME_ATTRIBUTE, common_name);
            }
            metrics.push(EmittedMetric::gauge(
                percentiles_name.as_str(),
                raw / self.scale_factor,
                interval.end_ms(),
                percentile_attributes,
            ));
        }
        metrics
    }
}

impl Default for DistributionTransformer {
    fn default() -> Self {
        Self::unscaled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_export_domain::{AttributeValue, UniformSnapshot};

    fn percentile_value(metrics: &[EmittedMetric], label: f64) -> Option<f64> {
        metrics
            .iter()
            .find(|metric| {
                metric.attributes().get(PERCENTILE_ATTRIBUTE) == Some(&AttributeValue::from(label))
            })
            .and_then(EmittedMetric::value)
    }

    #[test]
    fn emits_summary_and_six_percentiles() {
        let snapshot = UniformSnapshot::new(vec![10.0, 20.0, 30.0, 40.0]);
        let interval = HarvestInterval::new(100, 200);
        let metrics = DistributionTransformer::unscaled().transform(
            "latency",
            &snapshot,
            interval,
            &Attributes::new(),
        );

        assert_eq!(metrics.len(), 7);
        let summaries: Vec<_> = metrics
            .iter()
            .filter(|metric| matches!(metric, EmittedMetric::Summary { .. }))
            .collect();
        assert_eq!(summaries.len(), 1);
        assert_eq!(
            metrics
                .iter()
                .filter(|metric| metric.name() == "latency.percentiles")
                .count(),
            6
        );
        for label in [50.0, 75.0, 95.0, 98.0, 99.0, 99.9] {
            assert!(percentile_value(&metrics, label).is_some(), "missing {label}");
        }
    }

    #[test]
    fn scale_applies_to_min_max_and_percentiles_but_not_sum() {
        let snapshot = UniformSnapshot::new(vec![2_000_000.0, 4_000_000.0]);
        let transformer = DistributionTransformer::new(1_000_000.0)
            .unwrap_or_else(|error| unreachable!("{error}"));
        let metrics = transformer.transform(
            "db.query",
            &snapshot,
            HarvestInterval::new(0, 10),
            &Attributes::new(),
        );

        assert!(metrics.iter().any(|metric| matches!(
            metric,
            EmittedMetric::Summary { count: 2, sum, min, max, .. }
                if (sum.0 - 6_000_000.0).abs() < 1e-6
                    && (min.0 - 2.0).abs() < 1e-9
                    && (max.0 - 4.0).abs() < 1e-9
        )));
        assert_eq!(percentile_value(&metrics, 50.0), Some(3.0));
        assert_eq!(percentile_value(&metrics, 99.9), Some(4.0));
    }

    #[test]
    fn median_gauge_has_common_name() {
        let snapshot = UniformSnapshot::new(vec![1.0]);
        let metrics = DistributionTransformer::unscaled().transform(
            "h",
            &snapshot,
            HarvestInterval::new(0, 1),
            &Attributes::new(),
        );
        let tagged: Vec<_> = metrics
            .iter()
            .filter(|metric| metric.attributes().contains_key(COMMON_NAME_ATTRIBUTE))
            .collect();

        assert_eq!(tagged.len(), 1);
        assert_eq!(
            tagged
                .first()
                .and_then(|metric| metric.attributes().get(PERCENTILE_ATTRIBUTE)),
            Some(&AttributeValue::from(50.0))
        );
    }

    #[test]
    fn empty_snapshot_still_reports() {
        let metrics = DistributionTransformer::unscaled().transform(
            "idle",
            &UniformSnapshot::default(),
            HarvestInterval::new(0, 1),
            &Attributes::new(),
        );
        assert_eq!(metrics.len(), 7);
        assert_eq!(percentile_value(&metrics, 75.0), Some(0.0));
    }

    #[test]
    fn rejects_non_positive_scale() {
        assert!(DistributionTransformer::new(0.0).is_err());
        assert!(DistributionTransformer::new(f64::NAN).is_err());
        assert!(DistributionTransformer::new(1e6).is_ok());
    }
}
