//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (stderr, filtered by RUST_LOG or config)
//!     → tower-http TraceLayer spans per request
//! ```
//!
//! Audit records are separate; see the `audit` module.

pub mod logging;
