//! Periodic harvest loop.

use metrics_export_app::HarvestCoordinator;
use metrics_export_config::ValidatedExporterConfig;
use metrics_export_ports::{LogFields, LoggerPort};
use metrics_export_shared::ErrorEnvelope;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Counters describing one scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
    /// Harvests whose batch was handed to the sender.
    pub harvests: u64,
    /// Harvests that returned an error.
    pub failures: u64,
    /// Whether a final harvest ran after cancellation.
    pub final_harvest: bool,
}

/// Drives [`HarvestCoordinator::harvest`] on a fixed period.
///
/// The first harvest runs one period after start. Harvests never overlap: a
/// tick that falls due while a harvest is still running is delayed. Failed
/// harvests are logged and the loop carries on.
pub struct HarvestScheduler {
    coordinator: Arc<HarvestCoordinator>,
    period: Duration,
    report_on_stop: bool,
    logger: Option<Arc<dyn LoggerPort>>,
}

impl HarvestScheduler {
    /// Harvest every `period` (clamped to at least one millisecond).
    pub fn new(coordinator: Arc<HarvestCoordinator>, period: Duration) -> Self {
        Self {
            coordinator,
            period: period.max(Duration::from_millis(1)),
            report_on_stop: true,
            logger: None,
        }
    }

    /// Period and stop behaviour taken from `config`.
    pub fn from_config(
        coordinator: Arc<HarvestCoordinator>,
        config: &ValidatedExporterConfig,
    ) -> Self {
        Self::new(coordinator, config.harvest_interval()).report_on_stop(config.report_on_stop)
    }

    /// Run one last harvest after cancellation.
    #[must_use]
    pub const fn report_on_stop(mut self, enabled: bool) -> Self {
        self.report_on_stop = enabled;
        self
    }

    /// Logger for harvest failures.
    #[must_use]
    pub fn logger(mut self, logger: Arc<dyn LoggerPort>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Harvest period.
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Harvest until `cancel` fires.
    ///
    /// Starts the coordinator if needed and stops it on exit only when this
    /// call started it.
    pub async fn run(&self, cancel: CancellationToken) -> SchedulerSummary {
        let mut summary = SchedulerSummary::default();
        let started_here = self.coordinator.start();

        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => self.harvest_once(&mut summary).await,
            }
        }

        if self.report_on_stop {
            summary.final_harvest = true;
            self.harvest_once(&mut summary).await;
        }
        if started_here {
            self.coordinator.stop();
        }
        summary
    }

    /// Run on the current tokio runtime.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<SchedulerSummary> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    async fn harvest_once(&self, summary: &mut SchedulerSummary) {
        match self.coordinator.harvest().await {
            Ok(_) => summary.harvests += 1,
            Err(error) => {
                summary.failures += 1;
                if let Some(logger) = self.logger.as_ref() {
                    logger.warn(
                        "scheduler.harvest_failed",
                        "Harvest failed; retrying next period",
                        Some(log_fields_failure(self.coordinator.name(), &error)),
                    );
                }
            },
        }
    }
}

impl std::fmt::Debug for HarvestScheduler {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HarvestScheduler")
            .field("reporter", &self.coordinator.name())
            .field("period", &self.period)
            .field("report_on_stop", &self.report_on_stop)
            .finish_non_exhaustive()
    }
}

fn log_fields_failure(reporter: &str, error: &ErrorEnvelope) -> LogFields {
    let mut fields = LogFields::new();
    fields.insert("reporter".into(), Value::String(reporter.to_string()));
    fields.insert("code".into(), Value::String(error.code.to_string()));
    fields.insert("message".into(), Value::String(error.message.clone()));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExporterBuilder;
    use metrics_export_testkit::{
        FailingSender, FakeRegistry, FixedCounter, ManualClock, RecordingLogger, RecordingSender,
    };

    fn coordinator_with(
        sender: Arc<dyn metrics_export_ports::MetricBatchSenderPort>,
    ) -> crate::InfraResult<(Arc<FakeRegistry>, Arc<HarvestCoordinator>)> {
        let registry = Arc::new(FakeRegistry::new());
        registry.add_counter("requests", Arc::new(FixedCounter::new(3)));
        let coordinator = ExporterBuilder::new(registry.clone(), sender)
            .clock(Arc::new(ManualClock::new(0)))
            .build()?;
        Ok((registry, Arc::new(coordinator)))
    }

    #[tokio::test]
    async fn cancelled_scheduler_still_reports_once() -> crate::InfraResult<()> {
        let sender = Arc::new(RecordingSender::new());
        let (registry, coordinator) = coordinator_with(sender.clone())?;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = HarvestScheduler::new(Arc::clone(&coordinator), Duration::from_secs(60))
            .run(cancel)
            .await;

        assert_eq!(
            summary,
            SchedulerSummary {
                harvests: 1,
                failures: 0,
                final_harvest: true,
            }
        );
        assert_eq!(sender.batches().len(), 1);
        assert!(!coordinator.is_started());
        assert_eq!(registry.listener_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn coordinator_started_by_the_caller_stays_started() -> crate::InfraResult<()> {
        let sender = Arc::new(RecordingSender::new());
        let (registry, coordinator) = coordinator_with(sender.clone())?;
        assert!(coordinator.start());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = HarvestScheduler::new(Arc::clone(&coordinator), Duration::from_secs(60))
            .run(cancel)
            .await;

        assert_eq!(summary.harvests, 1);
        assert!(coordinator.is_started());
        assert_eq!(registry.listener_count(), 5);
        assert!(coordinator.stop());
        Ok(())
    }

    #[tokio::test]
    async fn report_on_stop_can_be_disabled() -> crate::InfraResult<()> {
        let sender = Arc::new(RecordingSender::new());
        let (_registry, coordinator) = coordinator_with(sender.clone())?;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = HarvestScheduler::new(coordinator, Duration::from_secs(60))
            .report_on_stop(false)
            .run(cancel)
            .await;

        assert_eq!(summary, SchedulerSummary::default());
        assert!(sender.batches().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn harvests_periodically_until_cancelled() -> crate::InfraResult<()> {
        let sender = Arc::new(RecordingSender::new());
        let (_registry, coordinator) = coordinator_with(sender.clone())?;
        let cancel = CancellationToken::new();
        let handle = HarvestScheduler::new(coordinator, Duration::from_millis(10))
            .report_on_stop(false)
            .spawn(cancel.clone());

        let deadline = Instant::now() + Duration::from_secs(5);
        while sender.batches().len() < 2 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancel();
        let summary = handle.await.unwrap_or_default();

        assert!(summary.harvests >= 2);
        assert_eq!(summary.failures, 0);
        assert!(!summary.final_harvest);
        Ok(())
    }

    #[tokio::test]
    async fn failures_are_logged_and_counted() -> crate::InfraResult<()> {
        let sender = Arc::new(FailingSender::new());
        let (_registry, coordinator) = coordinator_with(sender.clone())?;
        let logger = Arc::new(RecordingLogger::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = HarvestScheduler::new(coordinator, Duration::from_secs(60))
            .logger(logger.clone())
            .run(cancel)
            .await;

        assert_eq!(summary.failures, 1);
        assert_eq!(summary.harvests, 0);
        assert_eq!(logger.events_named("scheduler.harvest_failed").len(), 1);
        assert_eq!(sender.attempts(), 1);
        Ok(())
    }
}
