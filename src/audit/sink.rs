//! Audit record sinks.
//!
//! # Responsibilities
//! - Accept rendered records and write each one contiguously
//! - Swallow write failures; the client response never depends on them
//!
//! # Design Decisions
//! - Sinks are synchronous: records are emitted from `Drop` paths where
//!   no executor is guaranteed
//! - One mutex per sink serializes concurrent records

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crate::audit::formatter::AuditFormatter;
use crate::capture::LogRecord;
use crate::config::AuditTarget;

/// Destination for rendered audit records.
pub trait LogSink: Send + Sync {
    /// Write one complete record.
    fn write_record(&self, record: &[u8]) -> io::Result<()>;
}

/// Sink over any byte writer.
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> LogSink for WriterSink<W> {
    fn write_record(&self, record: &[u8]) -> io::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| io::Error::other("audit sink mutex poisoned"))?;
        writer.write_all(record)?;
        writer.flush()
    }
}

/// Build the sink for a configured target.
pub fn sink_for(target: AuditTarget) -> Arc<dyn LogSink> {
    match target {
        AuditTarget::Stdout => Arc::new(WriterSink::new(io::stdout())),
        AuditTarget::Stderr => Arc::new(WriterSink::new(io::stderr())),
    }
}

/// In-memory sink keeping every record; used by tests and embedders.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of every record written so far.
    pub fn records(&self) -> Vec<Vec<u8>> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Records decoded lossily as text.
    pub fn texts(&self) -> Vec<String> {
        self.records()
            .iter()
            .map(|r| String::from_utf8_lossy(r).into_owned())
            .collect()
    }
}

impl LogSink for MemorySink {
    fn write_record(&self, record: &[u8]) -> io::Result<()> {
        self.records
            .lock()
            .map_err(|_| io::Error::other("memory sink mutex poisoned"))?
            .push(record.to_vec());
        Ok(())
    }
}

/// Formatter plus sink: the audit log handed to each exchange.
#[derive(Clone)]
pub struct AuditLog {
    formatter: AuditFormatter,
    sink: Arc<dyn LogSink>,
}

impl AuditLog {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            formatter: AuditFormatter,
            sink,
        }
    }

    /// Render and write a record. Failures are logged and dropped.
    pub fn emit(&self, record: &LogRecord<'_>) {
        let rendered = self.formatter.render(record);
        if let Err(e) = self.sink.write_record(&rendered) {
            tracing::warn!(error = %e, "Failed to write audit record");
        }
    }
}

impl fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditLog").finish_non_exhaustive()
    }
}
