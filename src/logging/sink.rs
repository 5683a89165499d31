/*!
 * Log Sinks
 * Destinations for completed records; the emitter never retries a failed write
 */

use crate::core::errors::SinkError;
use crate::core::types::Level;
use crate::logging::record::LogRecord;
use crossbeam_queue::ArrayQueue;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Destination for completed log records
///
/// Implementations may buffer or block internally; the emitter counts a
/// failed write and drops the record, it never retries and never surfaces
/// the failure to business logic.
pub trait Sink: Send + Sync {
    fn write(&self, record: &LogRecord) -> Result<(), SinkError>;
}

/// Writes records as JSON lines to any `Write` target
pub struct JsonLineSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> Sink for JsonLineSink<W> {
    fn write(&self, record: &LogRecord) -> Result<(), SinkError> {
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Forwards records into the `tracing` ecosystem
///
/// Lets services that already run a tracing subscriber consume SDK records
/// without a second pipeline. Fields are carried as a JSON blob since
/// tracing field sets are static per call site.
pub struct TracingSink;

impl Sink for TracingSink {
    fn write(&self, record: &LogRecord) -> Result<(), SinkError> {
        let fields = serde_json::to_string(&record.fields)?;
        let message = record.message.as_str();
        match record.level {
            Level::Trace => tracing::trace!(target: "obskit", fields = %fields, "{message}"),
            Level::Debug => tracing::debug!(target: "obskit", fields = %fields, "{message}"),
            Level::Info => tracing::info!(target: "obskit", fields = %fields, "{message}"),
            Level::Warn => tracing::warn!(target: "obskit", fields = %fields, "{message}"),
            Level::Error | Level::Critical => {
                let error = record
                    .error
                    .as_ref()
                    .map(|e| e.message.clone())
                    .unwrap_or_default();
                tracing::error!(target: "obskit", fields = %fields, error = %error, "{message}")
            }
        }
        Ok(())
    }
}

/// Bounded drop-oldest buffer in front of an exporter
///
/// The hot path never waits: on overflow the oldest record is discarded and
/// counted. An exporter drains off the hot path on its own schedule.
pub struct BufferSink {
    queue: ArrayQueue<LogRecord>,
    dropped: AtomicU64,
}

impl BufferSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            dropped: AtomicU64::new(0),
        }
    }

    /// Take everything currently buffered, oldest first
    pub fn drain(&self) -> Vec<LogRecord> {
        let mut records = Vec::with_capacity(self.queue.len());
        while let Some(record) = self.queue.pop() {
            records.push(record);
        }
        records
    }

    /// Records discarded because the buffer was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Sink for BufferSink {
    fn write(&self, record: &LogRecord) -> Result<(), SinkError> {
        let mut pending = record.clone();
        // Drop-oldest: make room rather than block or reject the new record
        while let Err(rejected) = self.queue.push(pending) {
            pending = rejected;
            if self.queue.pop().is_some() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

/// Collects records in memory; test instrumentation
#[derive(Default)]
pub struct CaptureSink {
    records: Mutex<Vec<LogRecord>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Sink for CaptureSink {
    fn write(&self, record: &LogRecord) -> Result<(), SinkError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}
