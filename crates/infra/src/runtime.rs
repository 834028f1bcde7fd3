//! Config-driven exporter wiring used by CLI surfaces.

use crate::{ExporterBuilder, HarvestScheduler, InfraResult, SchedulerSummary};
use metrics_export_app::HarvestCoordinator;
use metrics_export_config::ValidatedExporterConfig;
use metrics_export_ports::{LoggerPort, MetricBatchSenderPort, MetricRegistryPort};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A coordinator plus the scheduler that drives it.
pub struct ExporterRuntime {
    coordinator: Arc<HarvestCoordinator>,
    scheduler: HarvestScheduler,
}

impl ExporterRuntime {
    /// Wire a coordinator and scheduler from `config`.
    pub fn from_config(
        config: &ValidatedExporterConfig,
        registry: Arc<dyn MetricRegistryPort>,
        sender: Arc<dyn MetricBatchSenderPort>,
        logger: Option<Arc<dyn LoggerPort>>,
    ) -> InfraResult<Self> {
        let mut builder = ExporterBuilder::from_config(config, registry, sender);
        if let Some(logger) = logger.as_ref() {
            builder = builder.logger(Arc::clone(logger));
        }
        let coordinator = Arc::new(builder.build()?);

        let mut scheduler = HarvestScheduler::from_config(Arc::clone(&coordinator), config);
        if let Some(logger) = logger {
            scheduler = scheduler.logger(logger);
        }
        Ok(Self {
            coordinator,
            scheduler,
        })
    }

    /// The wired coordinator.
    pub const fn coordinator(&self) -> &Arc<HarvestCoordinator> {
        &self.coordinator
    }

    /// Run one harvest outside the schedule.
    pub async fn harvest_once(&self) -> InfraResult<metrics_export_app::HarvestReport> {
        self.coordinator.harvest().await
    }

    /// Harvest on schedule until `cancel` fires.
    pub async fn run_until_cancelled(self, cancel: CancellationToken) -> SchedulerSummary {
        self.scheduler.run(cancel).await
    }
}

impl std::fmt::Debug for ExporterRuntime {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ExporterRuntime")
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}
