//! Harvest interval tracking.

use metrics_export_domain::HarvestInterval;
use metrics_export_ports::ClockPort;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Tracks the end of the previous harvest against a live clock.
///
/// `previous` starts at construction time and moves only through
/// [`IntervalClock::advance`], once per harvest, after the batch is built.
pub struct IntervalClock {
    clock: Arc<dyn ClockPort>,
    previous_ms: AtomicU64,
}

impl IntervalClock {
    /// Start tracking; the first interval begins now.
    pub fn new(clock: Arc<dyn ClockPort>) -> Self {
        let previous_ms = AtomicU64::new(clock.now_ms());
        Self { clock, previous_ms }
    }

    /// Current time.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// End of the previous harvest.
    pub fn previous_ms(&self) -> u64 {
        self.previous_ms.load(Ordering::Acquire)
    }

    /// `[previous, now]` captured together.
    pub fn interval(&self) -> HarvestInterval {
        let previous_ms = self.previous_ms();
        HarvestInterval::new(previous_ms, self.now_ms())
    }

    /// Close the current interval: `previous = now()`. Returns the new value.
    pub fn advance(&self) -> u64 {
        let now_ms = self.now_ms();
        self.previous_ms.store(now_ms, Ordering::Release);
        now_ms
    }
}

impl fmt::Debug for IntervalClock {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("IntervalClock")
            .field("previous_ms", &self.previous_ms())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_export_testkit::ManualClock;

    #[test]
    fn first_interval_starts_at_construction() {
        let clock = Arc::new(ManualClock::new(1_000));
        let interval_clock = IntervalClock::new(clock.clone());

        clock.advance_ms(5_000);
        let interval = interval_clock.interval();

        assert_eq!(interval.start_ms(), 1_000);
        assert_eq!(interval.end_ms(), 6_000);
    }

    #[test]
    fn advance_moves_previous_to_now() {
        let clock = Arc::new(ManualClock::new(0));
        let interval_clock = IntervalClock::new(clock.clone());

        clock.set_ms(2_500);
        assert_eq!(interval_clock.advance(), 2_500);
        assert_eq!(interval_clock.previous_ms(), 2_500);

        clock.set_ms(4_000);
        assert_eq!(interval_clock.interval(), HarvestInterval::new(2_500, 4_000));
    }

    #[test]
    fn reads_do_not_move_the_interval() {
        let clock = Arc::new(ManualClock::new(10));
        let interval_clock = IntervalClock::new(clock.clone());

        clock.set_ms(20);
        let _ = interval_clock.now_ms();
        let _ = interval_clock.interval();
        assert_eq!(interval_clock.previous_ms(), 10);
    }
}
