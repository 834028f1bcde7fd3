//! Cumulative count to interval delta conversion.

use dashmap::{DashMap, DashSet};
use metrics_export_domain::{Attributes, EmittedMetric, HarvestInterval};
use std::collections::HashSet;

/// Per-name last-seen cumulative counts.
///
/// `observe` replaces the stored count and returns the delta in one atomic
/// step per name. A count lower than the stored one is read as a counter
/// reset: the new count itself becomes the delta. A legitimate decrement is
/// indistinguishable from a reset and over-reports.
///
/// A removal can land while a harvest is still observing the removed metric,
/// which would re-insert its state. Removals are therefore journaled between
/// [`DeltaCounter::begin_sweep`] and [`DeltaCounter::retain_names`], and the
/// sweep drops them again.
#[derive(Debug, Default)]
pub struct DeltaCounter {
    previous: DashMap<Box<str>, i64>,
    removed: DashSet<Box<str>>,
}

impl DeltaCounter {
    /// Create an empty counter state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `current` for `name` and return the delta since the last call.
    pub fn observe(&self, name: &str, current: i64) -> i64 {
        match self.previous.insert(name.into(), current) {
            Some(previous) if previous <= current => current.saturating_sub(previous),
            _ => current,
        }
    }

    /// Drop the state for `name`; the next observation is treated as first-seen.
    pub fn remove(&self, name: &str) -> Option<i64> {
        let count = self.previous.remove(name).map(|(_, count)| count);
        self.removed.insert(name.into());
        count
    }

    /// Forget removals seen before the registry snapshot of a harvest.
    pub fn begin_sweep(&self) {
        self.removed.clear();
    }

    /// Keep state only for `live` names not removed since [`Self::begin_sweep`].
    pub fn retain_names(&self, live: &HashSet<Box<str>>) {
        self.previous
            .retain(|name, _| live.contains(name) && !self.removed.contains(name));
        self.removed.clear();
    }

    /// Last recorded count for `name`.
    pub fn last_count(&self, name: &str) -> Option<i64> {
        self.previous.get(name).map(|entry| *entry.value())
    }

    /// Number of tracked names.
    pub fn len(&self) -> usize {
        self.previous.len()
    }

    /// Returns true when no names are tracked.
    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }

    /// Observe and wrap the delta in a count over `interval`.
    #[allow(
        clippy::cast_precision_loss,
        reason = "deltas are reported as doubles on the wire"
    )]
    pub fn transform(
        &self,
        name: &str,
        current: i64,
        interval: HarvestInterval,
        attributes: Attributes,
    ) -> EmittedMetric {
        let delta = self.observe(name, current);
        EmittedMetric::count(name, delta as f64, interval, attributes)
    }
}
