//! Batch sender boundary.

use crate::BoxFuture;
use metrics_export_domain::MetricBatch;
use metrics_export_shared::Result;

/// Accepts finished batches for delivery.
///
/// Retries, backoff, authentication, and wire encoding are the sender's
/// concern. An `Ok` return means the batch was handed off.
pub trait MetricBatchSenderPort: Send + Sync {
    /// Hand one batch to the backend.
    fn send_batch(&self, batch: MetricBatch) -> BoxFuture<'_, Result<()>>;
}
