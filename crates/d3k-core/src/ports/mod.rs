//! Ports implemented by the runtime and consumed by producers.
//!
//! Producers (the dev-server output readers, the browser-event ingestion
//! endpoint) never touch the log file directly. They hand records to a
//! [`LogSinkPort`], which lets the CLI wire the real writer and tests wire
//! a recording sink.

use crate::domain::LogRecord;

/// Port for appending records to the unified log.
///
/// Implementations must be thread-safe and must not block the caller on
/// file I/O.
pub trait LogSinkPort: Send + Sync {
    /// Enqueue one record. Delivery failures are reported by the sink
    /// itself, never to the producer.
    fn record(&self, record: LogRecord);
}

/// A sink that drops every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogSink;

impl LogSinkPort for NoopLogSink {
    fn record(&self, _record: LogRecord) {}
}
