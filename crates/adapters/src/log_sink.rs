//! Log sink helpers for diagnostic adapters.

use std::io::Write;

/// A sink that receives pre-formatted lines.
pub trait LogSink: Send + Sync {
    /// Write a line to the sink.
    fn write_line(&self, line: &str);
}

/// Log sink that writes to stderr.
#[derive(Debug, Default)]
pub struct StderrLogSink;

impl LogSink for StderrLogSink {
    fn write_line(&self, line: &str) {
        let mut stderr = std::io::stderr().lock();
        if let Err(error) = stderr.write_all(line.as_bytes()) {
            eprintln!("log sink write failed: {error}");
        }
    }
}

/// Log sink that writes to stdout.
#[derive(Debug, Default)]
pub struct StdoutLogSink;

impl LogSink for StdoutLogSink {
    fn write_line(&self, line: &str) {
        let mut stdout = std::io::stdout().lock();
        if let Err(error) = stdout.write_all(line.as_bytes()).and_then(|()| stdout.flush()) {
            eprintln!("log sink write failed: {error}");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::LogSink;
    use std::sync::{Mutex, PoisonError};

    #[derive(Debug, Default)]
    pub(crate) struct MemorySink {
        lines: Mutex<Vec<String>>,
    }

    impl MemorySink {
        pub(crate) fn take(&self) -> Vec<String> {
            let mut guard = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        }
    }

    impl LogSink for MemorySink {
        fn write_line(&self, line: &str) {
            let mut guard = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
            guard.push(line.to_string());
        }
    }

    #[test]
    fn memory_sink_captures_lines() {
        let sink = MemorySink::default();
        sink.write_line("hello\n");
        sink.write_line("world\n");

        let lines = sink.take();
        assert_eq!(lines, vec!["hello\n".to_string(), "world\n".to_string()]);
        assert!(sink.take().is_empty());
    }
}
