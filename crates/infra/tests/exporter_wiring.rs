//! End-to-end wiring: in-memory registry, builder, coordinator, and sender.

use metrics_export_adapters::InMemoryMetricRegistry;
use metrics_export_config::parse_exporter_config_json;
use metrics_export_domain::{EmittedMetric, MetricBatch};
use metrics_export_infra::{ExporterBuilder, ExporterRuntime, InfraResult};
use metrics_export_testkit::{ManualClock, RecordingSender};
use std::sync::Arc;

fn values_named(batch: &MetricBatch, name: &str, type_label: &str) -> Vec<f64> {
    let mut values: Vec<f64> = batch
        .iter()
        .filter(|metric| metric.name() == name && metric.type_label() == type_label)
        .filter_map(EmittedMetric::value)
        .collect();
    values.sort_by(f64::total_cmp);
    values
}

#[tokio::test]
async fn counters_report_deltas_and_forget_removed_metrics() -> InfraResult<()> {
    let clock = Arc::new(ManualClock::new(10_000));
    let registry = Arc::new(InMemoryMetricRegistry::with_clock(clock.clone()));
    let sender = Arc::new(RecordingSender::new());
    let coordinator = ExporterBuilder::new(registry.clone(), sender.clone())
        .clock(clock.clone())
        .build()?;
    assert!(coordinator.start());

    let requests = registry.counter("requests")?;
    requests.inc_by(5);
    clock.advance_ms(5_000);
    let first = coordinator.harvest().await?;
    assert_eq!(first.interval_start_ms, 10_000);
    assert_eq!(first.interval_end_ms, 15_000);

    requests.inc_by(3);
    clock.advance_ms(5_000);
    let second = coordinator.harvest().await?;
    assert_eq!(second.interval_start_ms, 15_000);

    assert!(registry.remove("requests"));
    registry.counter("requests")?.inc_by(10);
    clock.advance_ms(5_000);
    coordinator.harvest().await?;

    let batches = sender.batches();
    assert_eq!(batches.len(), 3);
    assert_eq!(values_named(&batches[0], "requests", "count"), vec![5.0]);
    assert_eq!(values_named(&batches[1], "requests", "count"), vec![3.0]);
    assert_eq!(values_named(&batches[2], "requests", "count"), vec![10.0]);

    assert!(coordinator.stop());
    Ok(())
}

#[tokio::test]
async fn runtime_from_config_reports_gauges_and_meter_rates() -> InfraResult<()> {
    let config = parse_exporter_config_json(
        r#"{
            "name": "inventory",
            "disabledRateWindows": ["m5_rate", "m15_rate"],
            "commonAttributes": { "region": "eu-west-1", "nested": { "ignored": true } }
        }"#,
    )?;
    let clock = Arc::new(ManualClock::new(0));
    let registry = Arc::new(InMemoryMetricRegistry::with_clock(clock.clone()));
    let sender = Arc::new(RecordingSender::new());

    registry.gauge("stock.level")?.set(42_i64);
    registry.gauge("stock.status")?.set("restocking");
    registry.meter("orders")?.mark_n(25);
    clock.advance_ms(5_000);

    let runtime = ExporterRuntime::from_config(&config, registry.clone(), sender.clone(), None)?;
    let report = runtime.harvest_once().await?;
    assert!(!report.is_partial());

    let batch = sender.last().unwrap_or_default();
    assert_eq!(values_named(&batch, "stock.level", "gauge"), vec![42.0]);
    assert!(values_named(&batch, "stock.status", "gauge").is_empty());
    assert_eq!(values_named(&batch, "orders.rates", "gauge"), vec![5.0, 5.0]);
    assert!(batch.common_attributes().contains_key("region"));
    assert!(!batch.common_attributes().contains_key("nested"));
    Ok(())
}
