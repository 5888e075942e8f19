//! Audit logging subsystem.
//!
//! # Data Flow
//! ```text
//! completed exchange (RequestSnapshot + ResponseCapture)
//!     → formatter.rs (summary line, header blocks, bodies)
//!     → sink.rs (stdout, stderr or in-memory)
//! ```
//!
//! # Design Decisions
//! - Human-readable text only; operational logs go through `tracing`
//! - One record per request, written in a single sink call
//! - Logging fails open: sink errors never reach the client

pub mod formatter;
pub mod sink;

pub use formatter::AuditFormatter;
pub use sink::{sink_for, AuditLog, LogSink, MemorySink, WriterSink};
