use metrics_export_ports::{Counting, HistogramMetric, Sampling, Snapshot, UniformSnapshot};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Samples retained by a histogram created without an explicit window.
pub const DEFAULT_HISTOGRAM_WINDOW: usize = 1028;

/// Histogram retaining the most recent `window` samples.
///
/// The count covers every update, including samples already evicted.
#[derive(Debug)]
pub struct SlidingWindowHistogram {
    window: usize,
    samples: Mutex<VecDeque<f64>>,
    count: AtomicI64,
}

impl SlidingWindowHistogram {
    /// Create a histogram retaining [`DEFAULT_HISTOGRAM_WINDOW`] samples.
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(DEFAULT_HISTOGRAM_WINDOW)
    }

    /// Create a histogram retaining `window` samples (at least one).
    #[must_use]
    pub fn with_window(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: Mutex::new(VecDeque::with_capacity(window)),
            count: AtomicI64::new(0),
        }
    }

    /// Record one sample.
    pub fn update(&self, value: f64) {
        {
            let mut samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
            if samples.len() == self.window {
                samples.pop_front();
            }
            samples.push_back(value);
        }
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Retained sample capacity.
    #[must_use]
    pub const fn window(&self) -> usize {
        self.window
    }
}

impl Default for SlidingWindowHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Counting for SlidingWindowHistogram {
    fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Sampling for SlidingWindowHistogram {
    fn snapshot(&self) -> Box<dyn Snapshot> {
        let values: Vec<f64> = self
            .samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect();
        Box::new(UniformSnapshot::new(values))
    }
}

impl HistogramMetric for SlidingWindowHistogram {}
