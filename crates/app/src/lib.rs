//! # metrics-export-app
//!
//! The metric transformation engine: interval tracking, customizers, the
//! counting, rate, and distribution primitives, one transformer per metric
//! kind, and the harvest coordinator that drives them.
//! This crate depends on `core`, `ports`, `domain`, and `shared`.

pub mod coordinator;
pub mod customizer;
pub mod delta;
pub mod distribution;
pub mod filter;
pub mod interval;
pub mod kinds;
pub mod rates;

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub use coordinator::{
    HarvestCoordinator, HarvestCoordinatorDeps, HarvestCoordinatorOptions, HarvestReport,
    HarvestState, KindTransformers,
};
pub use customizer::{
    Customizers, IdentityAttributesCustomizer, IdentityNameCustomizer,
    MetricAttributesCustomizer, MetricIdentity, MetricNameCustomizer,
};
pub use delta::DeltaCounter;
pub use distribution::{
    COMMON_NAME_ATTRIBUTE, DistributionTransformer, PERCENTILE_ATTRIBUTE, PERCENTILES,
    PERCENTILES_SUFFIX, Percentile,
};
pub use filter::{AllowAll, MetricFilter, NamePrefixFilter};
pub use interval::IntervalClock;
pub use kinds::{
    CounterTransformer, GaugeTransformer, HistogramTransformer, MeterTransformer,
    MetricTransformer, TimerTransformer, TransformerDeps,
};
pub use rates::{RATE_ATTRIBUTE, RATES_SUFFIX, RateTransformer, RateWindowPredicate};
