//! Statistical snapshots of sampled values.

/// Order statistics over a retained sample window.
pub trait Snapshot: Send + Sync {
    /// Number of retained samples.
    fn size(&self) -> usize;

    /// Retained raw samples, in ascending order.
    fn values(&self) -> &[f64];

    /// Smallest sample, or 0 when empty.
    fn min(&self) -> f64;

    /// Largest sample, or 0 when empty.
    fn max(&self) -> f64;

    /// Value at `quantile` in `[0, 1]`, or 0 when empty.
    fn value_at(&self, quantile: f64) -> f64;

    /// Median sample.
    fn median(&self) -> f64 {
        self.value_at(0.5)
    }

    /// Arithmetic sum of the retained samples.
    fn sum(&self) -> f64 {
        self.values().iter().sum()
    }
}

/// Snapshot over an equally-weighted sample window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformSnapshot {
    values: Vec<f64>,
}

impl UniformSnapshot {
    /// Build a snapshot; samples are sorted on construction.
    #[must_use]
    pub fn new(mut values: Vec<f64>) -> Self {
        values.sort_by(f64::total_cmp);
        Self { values }
    }
}

impl FromIterator<f64> for UniformSnapshot {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Snapshot for UniformSnapshot {
    fn size(&self) -> usize {
        self.values.len()
    }

    fn values(&self) -> &[f64] {
        &self.values
    }

    fn min(&self) -> f64 {
        self.values.first().copied().unwrap_or(0.0)
    }

    fn max(&self) -> f64 {
        self.values.last().copied().unwrap_or(0.0)
    }

    // Linear interpolation at position q * (n + 1), clamped to the ends.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "sample positions are small non-negative integers"
    )]
    fn value_at(&self, quantile: f64) -> f64 {
        let (Some(first), Some(last)) = (self.values.first(), self.values.last()) else {
            return 0.0;
        };
        let quantile = quantile.clamp(0.0, 1.0);
        let position = quantile * (self.values.len() as f64 + 1.0);
        let index = position.floor() as usize;

        if index < 1 {
            return *first;
        }
        if index >= self.values.len() {
            return *last;
        }

        match (self.values.get(index - 1), self.values.get(index)) {
            (Some(lower), Some(upper)) => {
                (position - position.floor()).mul_add(upper - lower, *lower)
            },
            _ => *last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_snapshot_reports_zero() {
        let snapshot = UniformSnapshot::default();
        assert_eq!(snapshot.size(), 0);
        assert!(snapshot.min().abs() < f64::EPSILON);
        assert!(snapshot.max().abs() < f64::EPSILON);
        assert!(snapshot.value_at(0.99).abs() < f64::EPSILON);
    }

    #[test]
    fn quantiles_interpolate_between_samples() {
        let snapshot: UniformSnapshot = (1..=5).map(f64::from).collect();

        assert!((snapshot.median() - 3.0).abs() < 1e-9);
        assert!((snapshot.value_at(0.75) - 4.5).abs() < 1e-9);
        assert!((snapshot.value_at(0.99) - 5.0).abs() < 1e-9);
        assert!((snapshot.value_at(0.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn samples_are_sorted_and_summed() {
        let snapshot = UniformSnapshot::new(vec![30.0, 10.0, 20.0]);
        assert_eq!(snapshot.values(), &[10.0, 20.0, 30.0]);
        assert!((snapshot.sum() - 60.0).abs() < 1e-9);
        assert!((snapshot.min() - 10.0).abs() < 1e-9);
        assert!((snapshot.max() - 30.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn quantiles_stay_within_bounds(
            samples in proptest::collection::vec(-1.0e6f64..1.0e6, 1..64),
            quantile in 0.0f64..=1.0,
        ) {
            let snapshot = UniformSnapshot::new(samples);
            let value = snapshot.value_at(quantile);
            prop_assert!(value >= snapshot.min() - 1e-6);
            prop_assert!(value <= snapshot.max() + 1e-6);
        }
    }
}
