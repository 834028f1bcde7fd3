//! `run` command: export a live registry until interrupted.

use crate::demo::DemoMetrics;
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output, log_info};
use anyhow::Context;
use metrics_export_adapters::{ConsoleSender, InMemoryMetricRegistry, LogSink};
use metrics_export_config::ValidatedExporterConfig;
use metrics_export_infra::{CancellationToken, ExporterRuntime, load_effective_config};
use metrics_export_ports::LoggerPort;
use metrics_export_shared::ErrorEnvelope;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Parsed `run` flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunCommandInput<'a> {
    pub config_path: Option<&'a Path>,
    pub overrides_json: Option<&'a str>,
    pub demo: bool,
    pub once: bool,
    pub duration: Option<Duration>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RunOutcome {
    harvests: u64,
    failures: u64,
    batches: u64,
    demo_steps: u64,
}

/// Load config, wire the exporter, and harvest until cancelled.
///
/// Batches go to `sink` as they are sent; the returned output only carries
/// the run summary.
pub fn run_exporter(
    mode: OutputMode,
    env: &BTreeMap<String, String>,
    input: RunCommandInput<'_>,
    sink: Arc<dyn LogSink>,
    logger: Option<Arc<dyn LoggerPort>>,
) -> Result<CliOutput, CliError> {
    let config = match load_effective_config(env, input.config_path, input.overrides_json) {
        Ok(config) => config,
        Err(error) => return Ok(format_error_output(mode, &error, ExitCode::InvalidInput)),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let outcome = match runtime.block_on(drive(&config, input, sink, logger)) {
        Ok(outcome) => outcome,
        Err(DriveError::Exporter(error)) => {
            return Ok(format_error_output(mode, &error, ExitCode::Internal));
        },
        Err(DriveError::Cli(error)) => return Err(error),
    };

    let mut stderr = String::new();
    log_info(&mut stderr, "exporter stopped", mode.no_progress);

    let status = if outcome.failures == 0 { "ok" } else { "degraded" };
    let exit_code = if outcome.harvests == 0 && outcome.failures > 0 {
        ExitCode::Internal
    } else {
        ExitCode::Ok
    };

    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "type": "summary",
            "status": status,
            "reporter": &*config.name,
            "harvests": outcome.harvests,
            "failures": outcome.failures,
            "batches": outcome.batches,
            "demoSteps": outcome.demo_steps,
        });
        let mut output = serde_json::to_string(&payload)?;
        output.push('\n');
        output
    } else {
        format!(
            concat!(
                "status: {}\nreporter: {}\nharvests: {}\n",
                "failures: {}\nbatches: {}\ndemo steps: {}\n",
            ),
            status,
            config.name,
            outcome.harvests,
            outcome.failures,
            outcome.batches,
            outcome.demo_steps,
        )
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code,
    })
}

enum DriveError {
    Exporter(ErrorEnvelope),
    Cli(CliError),
}

impl From<ErrorEnvelope> for DriveError {
    fn from(error: ErrorEnvelope) -> Self {
        Self::Exporter(error)
    }
}

impl From<anyhow::Error> for DriveError {
    fn from(error: anyhow::Error) -> Self {
        Self::Cli(CliError::Runtime(error))
    }
}

async fn drive(
    config: &ValidatedExporterConfig,
    input: RunCommandInput<'_>,
    sink: Arc<dyn LogSink>,
    logger: Option<Arc<dyn LoggerPort>>,
) -> Result<RunOutcome, DriveError> {
    let registry = Arc::new(InMemoryMetricRegistry::new());
    let demo = if input.demo {
        Some(DemoMetrics::register(&registry)?)
    } else {
        None
    };
    let sender = Arc::new(ConsoleSender::new(sink, config.name.clone()));
    let exporter = ExporterRuntime::from_config(config, registry, sender.clone(), logger)?;

    tracing::info!(
        reporter = %config.name,
        interval_ms = config.harvest_interval_ms,
        demo = input.demo,
        once = input.once,
        "exporter running"
    );

    if input.once {
        let coordinator = exporter.coordinator();
        coordinator.start();
        if let Some(demo) = demo.as_ref() {
            demo.step();
        }
        let report = exporter.harvest_once().await;
        coordinator.stop();
        let report = report?;
        tracing::debug!(metrics = report.metric_count, "single harvest sent");
        return Ok(RunOutcome {
            harvests: 1,
            failures: 0,
            batches: sender.batches_sent(),
            demo_steps: demo.as_ref().map_or(0, DemoMetrics::steps),
        });
    }

    let cancel = CancellationToken::new();
    spawn_cancel_watcher(cancel.clone(), input.duration);
    let demo_task = demo.map(|demo| tokio::spawn(demo.run(cancel.clone())));

    let summary = exporter.run_until_cancelled(cancel.clone()).await;
    cancel.cancel();

    let demo_steps = match demo_task {
        Some(task) => task.await.context("demo workload task failed")?,
        None => 0,
    };

    Ok(RunOutcome {
        harvests: summary.harvests,
        failures: summary.failures,
        batches: sender.batches_sent(),
        demo_steps,
    })
}

/// Cancel on Ctrl-C, or once `duration` has elapsed.
fn spawn_cancel_watcher(cancel: CancellationToken, duration: Option<Duration>) {
    tokio::spawn(watch_for_cancel(cancel, duration, tokio::signal::ctrl_c()));
}

// Without a signal handler the run only ends on the deadline or an external
// cancel.
async fn watch_for_cancel<F>(
    cancel: CancellationToken,
    duration: Option<Duration>,
    interrupt: F,
) where
    F: Future<Output = std::io::Result<()>>,
{
    let deadline = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };
    let interrupt = async {
        match interrupt.await {
            Ok(()) => tracing::info!("interrupt received; stopping exporter"),
            Err(error) => {
                tracing::warn!(error = %error, "interrupt handler unavailable");
                std::future::pending::<()>().await;
            },
        }
    };
    tokio::select! {
        () = cancel.cancelled() => {},
        () = interrupt => cancel.cancel(),
        () = deadline => cancel.cancel(),
    }
}
