//! Batch sender that prints batches as JSON lines.

use crate::log_sink::LogSink;
use metrics_export_ports::{BoxFuture, MetricBatch, MetricBatchSenderPort};
use metrics_export_shared::{ErrorClass, ErrorCode, ErrorEnvelope, Result};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Failures while rendering a batch.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleSenderError {
    /// A metric could not be encoded as JSON.
    #[error("failed to encode metric batch: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<ConsoleSenderError> for ErrorEnvelope {
    fn from(error: ConsoleSenderError) -> Self {
        match error {
            ConsoleSenderError::Encode(source) => Self::unexpected(
                ErrorCode::new("sender", "encode_failed"),
                source.to_string(),
                ErrorClass::NonRetriable,
            ),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchHeader<'a> {
    batch: u64,
    reporter: &'a str,
    metric_count: usize,
    common_attributes: &'a metrics_export_ports::Attributes,
}

/// Writes one header line and one line per metric for every batch.
///
/// Metric lines are sorted so repeated runs print identical output.
pub struct ConsoleSender {
    sink: Arc<dyn LogSink>,
    reporter: Box<str>,
    sent: AtomicU64,
}

impl ConsoleSender {
    /// Create a sender writing to `sink`, labelling batches with `reporter`.
    #[must_use]
    pub fn new(sink: Arc<dyn LogSink>, reporter: impl Into<Box<str>>) -> Self {
        Self {
            sink,
            reporter: reporter.into(),
            sent: AtomicU64::new(0),
        }
    }

    /// Number of batches written so far.
    #[must_use]
    pub fn batches_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    fn render(
        &self,
        batch: &MetricBatch,
        sequence: u64,
    ) -> std::result::Result<String, ConsoleSenderError> {
        let header = BatchHeader {
            batch: sequence,
            reporter: &self.reporter,
            metric_count: batch.len(),
            common_attributes: batch.common_attributes(),
        };

        let mut lines = batch
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        lines.sort_unstable();

        let mut out = serde_json::to_string(&header)?;
        out.push('\n');
        for line in lines {
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }
}

impl std::fmt::Debug for ConsoleSender {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ConsoleSender")
            .field("reporter", &self.reporter)
            .field("sent", &self.batches_sent())
            .finish_non_exhaustive()
    }
}

impl MetricBatchSenderPort for ConsoleSender {
    fn send_batch(&self, batch: MetricBatch) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let sequence = self.sent.load(Ordering::Relaxed) + 1;
            let rendered = self.render(&batch, sequence).map_err(ErrorEnvelope::from)?;
            self.sink.write_line(&rendered);
            self.sent.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
    }
}
