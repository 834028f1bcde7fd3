use metrics_export_ports::{ClockPort, Counting, MeterMetric, Metered};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

const TICK_INTERVAL_MS: u64 = 5_000;
const TICK_INTERVAL_SECONDS: f64 = 5.0;

/// One exponentially weighted moving average, in events per second.
#[derive(Debug, Clone, Copy)]
struct Ewma {
    alpha: f64,
    rate: f64,
    initialized: bool,
}

impl Ewma {
    fn over_minutes(minutes: f64) -> Self {
        Self {
            alpha: 1.0 - (-TICK_INTERVAL_SECONDS / (60.0 * minutes)).exp(),
            rate: 0.0,
            initialized: false,
        }
    }

    #[allow(
        clippy::cast_precision_loss,
        reason = "per-tick event counts stay far below 2^52"
    )]
    fn tick(&mut self, events: i64) {
        let instant = events as f64 / TICK_INTERVAL_SECONDS;
        if self.initialized {
            self.rate += self.alpha * (instant - self.rate);
        } else {
            self.rate = instant;
            self.initialized = true;
        }
    }
}

#[derive(Debug)]
struct MeterState {
    uncounted: i64,
    last_tick_ms: u64,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

impl MeterState {
    /// Apply every whole tick that elapsed before `now_ms`.
    fn tick_if_necessary(&mut self, now_ms: u64) {
        let age = now_ms.saturating_sub(self.last_tick_ms);
        if age < TICK_INTERVAL_MS {
            return;
        }
        let ticks = age / TICK_INTERVAL_MS;
        self.last_tick_ms = now_ms - age % TICK_INTERVAL_MS;

        let mut events = std::mem::take(&mut self.uncounted);
        for _ in 0..ticks {
            self.m1.tick(events);
            self.m5.tick(events);
            self.m15.tick(events);
            events = 0;
        }
    }
}

/// Meter with one, five, and fifteen minute moving averages.
///
/// Averages advance lazily in five second ticks whenever the meter is marked
/// or read.
pub struct EwmaMeter {
    clock: Arc<dyn ClockPort>,
    start_ms: u64,
    count: AtomicI64,
    state: Mutex<MeterState>,
}

impl EwmaMeter {
    /// Create a meter whose rates are measured against `clock`.
    pub fn new(clock: Arc<dyn ClockPort>) -> Self {
        let start_ms = clock.now_ms();
        Self {
            clock,
            start_ms,
            count: AtomicI64::new(0),
            state: Mutex::new(MeterState {
                uncounted: 0,
                last_tick_ms: start_ms,
                m1: Ewma::over_minutes(1.0),
                m5: Ewma::over_minutes(5.0),
                m15: Ewma::over_minutes(15.0),
            }),
        }
    }

    /// Record one event.
    pub fn mark(&self) {
        self.mark_n(1);
    }

    /// Record `events` events.
    pub fn mark_n(&self, events: i64) {
        let now_ms = self.clock.now_ms();
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.tick_if_necessary(now_ms);
            state.uncounted += events;
        }
        self.count.fetch_add(events, Ordering::Relaxed);
    }

    fn ticked_rate(&self, pick: fn(&MeterState) -> f64) -> f64 {
        let now_ms = self.clock.now_ms();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.tick_if_necessary(now_ms);
        pick(&state)
    }
}

impl std::fmt::Debug for EwmaMeter {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("EwmaMeter")
            .field("start_ms", &self.start_ms)
            .field("count", &self.count())
            .finish_non_exhaustive()
    }
}

impl Counting for EwmaMeter {
    fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Metered for EwmaMeter {
    #[allow(
        clippy::cast_precision_loss,
        reason = "mean rate is reported as a double"
    )]
    fn mean_rate(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        let elapsed_ms = self.clock.now_ms().saturating_sub(self.start_ms);
        if elapsed_ms == 0 {
            return 0.0;
        }
        count as f64 / (elapsed_ms as f64 / 1_000.0)
    }

    fn one_minute_rate(&self) -> f64 {
        self.ticked_rate(|state| state.m1.rate)
    }

    fn five_minute_rate(&self) -> f64 {
        self.ticked_rate(|state| state.m5.rate)
    }

    fn fifteen_minute_rate(&self) -> f64 {
        self.ticked_rate(|state| state.m15.rate)
    }
}

impl MeterMetric for EwmaMeter {}
