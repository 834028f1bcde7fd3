//! Logger adapter forwarding events to `tracing`.

use crate::logger::{fields_to_json, redact_fields};
use metrics_export_ports::{LogEvent, LogLevel, LoggerPort};

/// Logger that re-emits every [`LogEvent`] as a `tracing` event.
///
/// Fields are redacted and attached as one JSON-encoded `fields` value, so
/// whichever subscriber the binary installs decides the final format.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl LoggerPort for TracingLogger {
    fn log(&self, event: LogEvent) {
        let fields = event.fields.map(|mut fields| {
            redact_fields(&mut fields);
            fields_to_json(&fields).to_string()
        });
        let name = event.event.as_ref();
        let message = event.message.as_ref();

        match (event.level, fields) {
            (LogLevel::Debug, Some(fields)) => {
                tracing::debug!(event = %name, fields = %fields, "{message}");
            },
            (LogLevel::Debug, None) => tracing::debug!(event = %name, "{message}"),
            (LogLevel::Info, Some(fields)) => {
                tracing::info!(event = %name, fields = %fields, "{message}");
            },
            (LogLevel::Info, None) => tracing::info!(event = %name, "{message}"),
            (LogLevel::Warn, Some(fields)) => {
                tracing::warn!(event = %name, fields = %fields, "{message}");
            },
            (LogLevel::Warn, None) => tracing::warn!(event = %name, "{message}"),
            (LogLevel::Error, Some(fields)) => {
                tracing::error!(event = %name, fields = %fields, "{message}");
            },
            (LogLevel::Error, None) => tracing::error!(event = %name, "{message}"),
        }
    }
}
