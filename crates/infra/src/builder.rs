//! Composition of a [`HarvestCoordinator`] from configuration and ports.

use crate::InfraResult;
use metrics_export_adapters::SystemClock;
use metrics_export_app::{
    AllowAll, Customizers, DistributionTransformer, HarvestCoordinator, HarvestCoordinatorDeps,
    HarvestCoordinatorOptions, KindTransformers, MetricAttributesCustomizer, MetricFilter,
    MetricNameCustomizer, RateTransformer, RateWindowPredicate, TransformerDeps,
};
use metrics_export_config::{DEFAULT_REPORTER_NAME, ValidatedExporterConfig};
use metrics_export_domain::{Attributes, RateWindow, TimeUnit};
use metrics_export_ports::{ClockPort, LoggerPort, MetricBatchSenderPort, MetricRegistryPort};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Fluent builder for a coordinator.
///
/// Defaults: system clock, no logger, accept-all filter, rates per second,
/// durations in milliseconds, every rate window enabled, identity customizers.
pub struct ExporterBuilder {
    registry: Arc<dyn MetricRegistryPort>,
    sender: Arc<dyn MetricBatchSenderPort>,
    clock: Arc<dyn ClockPort>,
    logger: Option<Arc<dyn LoggerPort>>,
    name: Box<str>,
    filter: Arc<dyn MetricFilter>,
    rate_unit: TimeUnit,
    duration_unit: TimeUnit,
    common_attributes: Attributes,
    disabled_rate_windows: BTreeSet<RateWindow>,
    customizers: Customizers,
}

impl ExporterBuilder {
    /// Start a builder over `registry` delivering to `sender`.
    pub fn new(
        registry: Arc<dyn MetricRegistryPort>,
        sender: Arc<dyn MetricBatchSenderPort>,
    ) -> Self {
        Self {
            registry,
            sender,
            clock: Arc::new(SystemClock),
            logger: None,
            name: DEFAULT_REPORTER_NAME.into(),
            filter: Arc::new(AllowAll),
            rate_unit: TimeUnit::Seconds,
            duration_unit: TimeUnit::Milliseconds,
            common_attributes: Attributes::new(),
            disabled_rate_windows: BTreeSet::new(),
            customizers: Customizers::default(),
        }
    }

    /// Start a builder pre-populated from a validated config.
    pub fn from_config(
        config: &ValidatedExporterConfig,
        registry: Arc<dyn MetricRegistryPort>,
        sender: Arc<dyn MetricBatchSenderPort>,
    ) -> Self {
        Self::new(registry, sender)
            .name(config.name.clone())
            .rate_unit(config.rate_unit)
            .duration_unit(config.duration_unit)
            .common_attributes(config.common_attributes().clone())
            .disabled_rate_windows(config.disabled_rate_windows.iter().copied())
    }

    /// Clock used for interval bounds.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn ClockPort>) -> Self {
        self.clock = clock;
        self
    }

    /// Logger for lifecycle and failure events.
    #[must_use]
    pub fn logger(mut self, logger: Arc<dyn LoggerPort>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Reporter name.
    #[must_use]
    pub fn name(mut self, name: impl Into<Box<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Registry entry filter.
    #[must_use]
    pub fn filter(mut self, filter: Arc<dyn MetricFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Unit rates are reported per.
    #[must_use]
    pub const fn rate_unit(mut self, unit: TimeUnit) -> Self {
        self.rate_unit = unit;
        self
    }

    /// Unit timer durations are reported in.
    #[must_use]
    pub const fn duration_unit(mut self, unit: TimeUnit) -> Self {
        self.duration_unit = unit;
        self
    }

    /// Attributes attached to every batch.
    #[must_use]
    pub fn common_attributes(mut self, attributes: Attributes) -> Self {
        self.common_attributes = attributes;
        self
    }

    /// Rate windows left out of meter and timer output.
    #[must_use]
    pub fn disabled_rate_windows(mut self, windows: impl IntoIterator<Item = RateWindow>) -> Self {
        self.disabled_rate_windows = windows.into_iter().collect();
        self
    }

    /// Name customizer applied to every metric.
    #[must_use]
    pub fn name_customizer(mut self, customizer: Arc<dyn MetricNameCustomizer>) -> Self {
        self.customizers = self.customizers.with_name(customizer);
        self
    }

    /// Attributes customizer applied to every metric.
    #[must_use]
    pub fn attributes_customizer(
        mut self,
        customizer: Arc<dyn MetricAttributesCustomizer>,
    ) -> Self {
        self.customizers = self.customizers.with_attributes(customizer);
        self
    }

    /// Wire the transformers and return an unstarted coordinator.
    pub fn build(self) -> InfraResult<HarvestCoordinator> {
        let disabled = self.disabled_rate_windows;
        let enabled: RateWindowPredicate = Arc::new(move |window| !disabled.contains(&window));
        let rates = RateTransformer::new(self.rate_unit.as_seconds(), enabled);
        let durations = DistributionTransformer::new(duration_factor(self.duration_unit))?;

        let transformer_deps = TransformerDeps {
            customizers: self.customizers,
            logger: self.logger.clone(),
        };
        let transformers = KindTransformers::new(&transformer_deps, &rates, durations);

        let deps = HarvestCoordinatorDeps {
            registry: self.registry,
            sender: self.sender,
            clock: self.clock,
            logger: self.logger,
        };
        let options = HarvestCoordinatorOptions {
            name: self.name,
            common_attributes: self.common_attributes,
            filter: self.filter,
        };
        Ok(HarvestCoordinator::new(deps, transformers, options))
    }
}

#[allow(
    clippy::cast_precision_loss,
    reason = "largest unit is 8.64e13 ns, exact in f64"
)]
const fn duration_factor(unit: TimeUnit) -> f64 {
    unit.as_nanos() as f64
}

impl std::fmt::Debug for ExporterBuilder {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ExporterBuilder")
            .field("name", &self.name)
            .field("rate_unit", &self.rate_unit)
            .field("duration_unit", &self.duration_unit)
            .field("common_attributes", &self.common_attributes)
            .field("disabled_rate_windows", &self.disabled_rate_windows)
            .finish_non_exhaustive()
    }
}
