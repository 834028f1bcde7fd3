//! Emitted metrics and the per-harvest batch.

use crate::attributes::Attributes;
use ordered_float::OrderedFloat;
use serde::Serialize;
use std::collections::HashSet;
use std::collections::hash_set;

/// Bounds of one harvest interval in epoch milliseconds.
///
/// `start_ms <= end_ms` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestInterval {
    start_ms: u64,
    end_ms: u64,
}

impl HarvestInterval {
    /// Build an interval from the previous harvest end and the current time.
    ///
    /// A wall clock that stepped backwards yields an empty interval at `now_ms`.
    #[must_use]
    pub const fn new(previous_ms: u64, now_ms: u64) -> Self {
        let start_ms = if previous_ms <= now_ms {
            previous_ms
        } else {
            now_ms
        };
        Self {
            start_ms,
            end_ms: now_ms,
        }
    }

    /// Interval start (previous harvest end).
    #[must_use]
    pub const fn start_ms(self) -> u64 {
        self.start_ms
    }

    /// Interval end (current time).
    #[must_use]
    pub const fn end_ms(self) -> u64 {
        self.end_ms
    }

    /// Interval length in milliseconds.
    #[must_use]
    pub const fn duration_ms(self) -> u64 {
        self.end_ms - self.start_ms
    }
}

/// Statistical summary values carried by [`EmittedMetric::Summary`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryValues {
    /// Number of retained samples.
    pub count: u64,
    /// Sum of retained samples.
    pub sum: f64,
    /// Scaled minimum.
    pub min: f64,
    /// Scaled maximum.
    pub max: f64,
}

/// One metric ready for the wire.
///
/// Equality is structural, so a batch deduplicates identical metrics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum EmittedMetric {
    /// Point-in-time value.
    Gauge {
        /// Public metric name.
        name: Box<str>,
        /// Current value.
        value: OrderedFloat<f64>,
        /// Observation time.
        timestamp_ms: u64,
        /// Metric attributes.
        attributes: Attributes,
    },
    /// Change over an interval.
    Count {
        /// Public metric name.
        name: Box<str>,
        /// Delta over the interval.
        value: OrderedFloat<f64>,
        /// Interval start.
        interval_start_ms: u64,
        /// Interval end.
        interval_end_ms: u64,
        /// Metric attributes.
        attributes: Attributes,
    },
    /// Distribution summary over an interval.
    Summary {
        /// Public metric name.
        name: Box<str>,
        /// Sample count.
        count: u64,
        /// Sample sum.
        sum: OrderedFloat<f64>,
        /// Minimum sample.
        min: OrderedFloat<f64>,
        /// Maximum sample.
        max: OrderedFloat<f64>,
        /// Interval start.
        interval_start_ms: u64,
        /// Interval end.
        interval_end_ms: u64,
        /// Metric attributes.
        attributes: Attributes,
    },
}

impl EmittedMetric {
    /// Build a gauge.
    pub fn gauge(
        name: impl Into<Box<str>>,
        value: f64,
        timestamp_ms: u64,
        attributes: Attributes,
    ) -> Self {
        Self::Gauge {
            name: name.into(),
            value: OrderedFloat(value),
            timestamp_ms,
            attributes,
        }
    }

    /// Build a count over `interval`.
    pub fn count(
        name: impl Into<Box<str>>,
        value: f64,
        interval: HarvestInterval,
        attributes: Attributes,
    ) -> Self {
        Self::Count {
            name: name.into(),
            value: OrderedFloat(value),
            interval_start_ms: interval.start_ms(),
            interval_end_ms: interval.end_ms(),
            attributes,
        }
    }

    /// Build a summary over `interval`.
    pub fn summary(
        name: impl Into<Box<str>>,
        values: SummaryValues,
        interval: HarvestInterval,
        attributes: Attributes,
    ) -> Self {
        Self::Summary {
            name: name.into(),
            count: values.count,
            sum: OrderedFloat(values.sum),
            min: OrderedFloat(values.min),
            max: OrderedFloat(values.max),
            interval_start_ms: interval.start_ms(),
            interval_end_ms: interval.end_ms(),
            attributes,
        }
    }

    /// Public metric name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Gauge { name, .. } | Self::Count { name, .. } | Self::Summary { name, .. } => {
                name
            },
        }
    }

    /// Metric attributes.
    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        match self {
            Self::Gauge { attributes, .. }
            | Self::Count { attributes, .. }
            | Self::Summary { attributes, .. } => attributes,
        }
    }

    /// Gauge or count value; `None` for summaries.
    #[must_use]
    pub const fn value(&self) -> Option<f64> {
        match self {
            Self::Gauge { value, .. } | Self::Count { value, .. } => Some(value.0),
            Self::Summary { .. } => None,
        }
    }

    /// Wire type label (`gauge`, `count`, `summary`).
    #[must_use]
    pub const fn type_label(&self) -> &'static str {
        match self {
            Self::Gauge { .. } => "gauge",
            Self::Count { .. } => "count",
            Self::Summary { .. } => "summary",
        }
    }
}

/// One harvest worth of metrics plus the attributes shared by all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricBatch {
    metrics: HashSet<EmittedMetric>,
    common_attributes: Attributes,
}

impl MetricBatch {
    /// Create an empty batch carrying `common_attributes`.
    #[must_use]
    pub fn new(common_attributes: Attributes) -> Self {
        Self {
            metrics: HashSet::new(),
            common_attributes,
        }
    }

    /// Insert one metric; returns false when an equal metric was already present.
    pub fn insert(&mut self, metric: EmittedMetric) -> bool {
        self.metrics.insert(metric)
    }

    /// Number of distinct metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Returns true when the batch holds no metrics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Iterate the metrics in unspecified order.
    pub fn iter(&self) -> hash_set::Iter<'_, EmittedMetric> {
        self.metrics.iter()
    }

    /// Borrow the metric set.
    #[must_use]
    pub const fn metrics(&self) -> &HashSet<EmittedMetric> {
        &self.metrics
    }

    /// Attributes shared by every metric in the batch.
    #[must_use]
    pub const fn common_attributes(&self) -> &Attributes {
        &self.common_attributes
    }
}

impl Extend<EmittedMetric> for MetricBatch {
    fn extend<I: IntoIterator<Item = EmittedMetric>>(&mut self, iter: I) {
        self.metrics.extend(iter);
    }
}

impl<'a> IntoIterator for &'a MetricBatch {
    type Item = &'a EmittedMetric;
    type IntoIter = hash_set::Iter<'a, EmittedMetric>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.iter()
    }
}
