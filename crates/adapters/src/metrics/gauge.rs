use metrics_export_ports::{GaugeMetric, GaugeValue};
use std::sync::{Mutex, PoisonError};

/// Gauge holding the last value written to it.
#[derive(Debug)]
pub struct ValueGauge {
    value: Mutex<GaugeValue>,
}

impl ValueGauge {
    /// Create a gauge that reports [`GaugeValue::Absent`] until set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: Mutex::new(GaugeValue::Absent),
        }
    }

    /// Replace the current value.
    pub fn set(&self, value: impl Into<GaugeValue>) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = value.into();
    }

    /// Reset to [`GaugeValue::Absent`].
    pub fn clear(&self) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = GaugeValue::Absent;
    }
}

impl Default for ValueGauge {
    fn default() -> Self {
        Self::new()
    }
}

impl GaugeMetric for ValueGauge {
    fn value(&self) -> GaugeValue {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Gauge that samples a closure on every read.
pub struct FnGauge<F> {
    read: F,
}

impl<F> FnGauge<F>
where
    F: Fn() -> GaugeValue + Send + Sync,
{
    /// Wrap `read`.
    pub const fn new(read: F) -> Self {
        Self { read }
    }
}

impl<F> std::fmt::Debug for FnGauge<F> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("FnGauge").finish_non_exhaustive()
    }
}

impl<F> GaugeMetric for FnGauge<F>
where
    F: Fn() -> GaugeValue + Send + Sync,
{
    fn value(&self) -> GaugeValue {
        (self.read)()
    }
}
