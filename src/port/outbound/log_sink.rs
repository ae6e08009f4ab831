//! Durable log sink port.

/// Log output that buffers writes and must be drained before exit.
pub trait DurableLogSink: Send + Sync {
    /// Synchronously write out every buffered record.
    fn flush(&self);
}
