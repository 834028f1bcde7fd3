//! Wall-clock adapter.

use metrics_export_ports::ClockPort;
use std::time::{SystemTime, UNIX_EPOCH};

/// Clock backed by [`SystemTime`].
///
/// Reads before the Unix epoch clamp to zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|elapsed| u64::try_from(elapsed.as_millis()).ok())
            .unwrap_or_default()
    }
}
