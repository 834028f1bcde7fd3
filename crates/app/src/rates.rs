//! Meter rates to scaled rate gauges.

use metrics_export_domain::{Attributes, EmittedMetric, RateWindow};
use metrics_export_ports::Metered;
use std::fmt;
use std::sync::Arc;

/// Attribute key tagging each rate gauge with its window.
pub const RATE_ATTRIBUTE: &str = "rate";

/// Suffix appended to the metric name of rate gauges.
pub const RATES_SUFFIX: &str = ".rates";

/// Decides which rate windows are emitted.
pub type RateWindowPredicate = Arc<dyn Fn(RateWindow) -> bool + Send + Sync>;

/// Emits one `<name>.rates` gauge per enabled window.
#[derive(Clone)]
pub struct RateTransformer {
    rate_factor: f64,
    enabled: RateWindowPredicate,
}

impl RateTransformer {
    /// `rate_factor` is the number of seconds in the reporting unit.
    pub fn new(rate_factor: f64, enabled: RateWindowPredicate) -> Self {
        Self {
            rate_factor,
            enabled,
        }
    }

    /// Emit all four windows.
    pub fn all_windows(rate_factor: f64) -> Self {
        Self::new(rate_factor, Arc::new(|_| true))
    }

    /// Multiplier applied to every per-second rate.
    #[must_use]
    pub const fn rate_factor(&self) -> f64 {
        self.rate_factor
    }

    /// Returns true when `window` is emitted.
    pub fn is_enabled(&self, window: RateWindow) -> bool {
        (self.enabled)(window)
    }

    /// Scaled rate gauges for every enabled window.
    pub fn transform<M: Metered + ?Sized>(
        &self,
        name: &str,
        metered: &M,
        timestamp_ms: u64,
        attributes: &Attributes,
    ) -> Vec<EmittedMetric> {
        let rates_name = format!("{name}{RATES_SUFFIX}");
        RateWindow::ALL
            .into_iter()
            .filter(|window| self.is_enabled(*window))
            .map(|window| {
                EmittedMetric::gauge(
                    rates_name.as_str(),
                    metered.rate(window) * self.rate_factor,
                    timestamp_ms,
                    attributes.clone().with(RATE_ATTRIBUTE, window.code()),
                )
            })
            .collect()
    }
}

impl fmt::Debug for RateTransformer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RateTransformer")
            .field("rate_factor", &self.rate_factor)
            .finish_non_exhaustive()
    }
}
