//! Durable log sinks.

use std::io::{self, Write};

use parking_lot::Mutex;
use tracing_appender::non_blocking::WorkerGuard;

use crate::port::DurableLogSink;

/// Owns the guard of a `tracing-appender` non-blocking writer.
///
/// Dropping the guard makes the background writer drain everything still
/// queued before returning, so `flush` is that drop.
pub struct AppenderLogSink {
    guard: Mutex<Option<WorkerGuard>>,
}

impl AppenderLogSink {
    #[must_use]
    pub fn new(guard: WorkerGuard) -> Self {
        Self {
            guard: Mutex::new(Some(guard)),
        }
    }

    #[must_use]
    pub fn is_flushed(&self) -> bool {
        self.guard.lock().is_none()
    }
}

impl DurableLogSink for AppenderLogSink {
    fn flush(&self) {
        let guard = self.guard.lock().take();
        drop(guard);
    }
}

/// Sink for processes that only log to the console.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleLogSink;

impl DurableLogSink for ConsoleLogSink {
    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tracing_appender::rolling::{RollingFileAppender, Rotation};

    #[test]
    fn test_flush_drains_buffered_lines() {
        let dir = TempDir::new().unwrap();
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix("sink.log")
            .build(dir.path())
            .unwrap();
        let (mut writer, guard) = tracing_appender::non_blocking(appender);
        let sink = AppenderLogSink::new(guard);

        writer.write_all(b"last words\n").unwrap();
        sink.flush();

        assert!(sink.is_flushed());
        let written = std::fs::read_to_string(dir.path().join("sink.log")).unwrap();
        assert_eq!(written, "last words\n");
    }

    #[test]
    fn test_second_flush_is_noop() {
        let dir = TempDir::new().unwrap();
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix("twice.log")
            .build(dir.path())
            .unwrap();
        let (_writer, guard) = tracing_appender::non_blocking(appender);
        let sink = AppenderLogSink::new(guard);

        sink.flush();
        sink.flush();
        assert!(sink.is_flushed());
    }

    #[test]
    fn test_console_sink_flush_is_safe() {
        ConsoleLogSink.flush();
        ConsoleLogSink.flush();
    }
}
