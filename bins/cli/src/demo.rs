//! Synthetic workload for `mex run --demo`.

use metrics_export_adapters::{
    AtomicCounter, EwmaMeter, FnGauge, InMemoryMetricRegistry, SlidingWindowHistogram,
    SlidingWindowTimer, ValueGauge,
};
use metrics_export_ports::GaugeValue;
use metrics_export_shared::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const STEP_PERIOD: Duration = Duration::from_millis(250);

/// Handles to the metrics the demo workload drives.
#[derive(Debug)]
pub struct DemoMetrics {
    requests: Arc<AtomicCounter>,
    queue_depth: Arc<ValueGauge>,
    payload_bytes: Arc<SlidingWindowHistogram>,
    orders: Arc<EwmaMeter>,
    checkout: Arc<SlidingWindowTimer>,
    steps: Arc<AtomicU64>,
}

impl DemoMetrics {
    /// Register the demo metrics under the `demo.` prefix.
    pub fn register(registry: &InMemoryMetricRegistry) -> Result<Self> {
        let steps = Arc::new(AtomicU64::new(0));
        let observed = Arc::clone(&steps);
        registry.register_gauge(
            "demo.steps",
            Arc::new(FnGauge::new(move || {
                GaugeValue::from(observed.load(Ordering::Relaxed))
            })),
        )?;

        Ok(Self {
            requests: registry.counter("demo.requests")?,
            queue_depth: registry.gauge("demo.queue_depth")?,
            payload_bytes: registry.histogram("demo.payload_bytes")?,
            orders: registry.meter("demo.orders")?,
            checkout: registry.timer("demo.checkout")?,
            steps,
        })
    }

    /// Apply one deterministic step of traffic.
    #[allow(
        clippy::cast_precision_loss,
        reason = "step counters stay far below 2^52"
    )]
    pub fn step(&self) {
        let step = self.steps.fetch_add(1, Ordering::Relaxed) + 1;
        let phase = step % 10;

        self.requests.inc_by(3);
        self.queue_depth.set(phase);
        self.payload_bytes.update(512.0 + (phase * 128) as f64);
        self.orders.mark_n(i64::from(phase % 3 == 0));
        self.checkout.update(Duration::from_millis(20 + phase * 15));
    }

    /// Number of steps applied so far.
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Relaxed)
    }

    /// Step every 250 ms until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) -> u64 {
        let mut ticker = tokio::time::interval(STEP_PERIOD);
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => self.step(),
            }
        }
        self.steps()
    }
}
