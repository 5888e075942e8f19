//! Audit Proxy Library
//!
//! A transparent reverse proxy to one upstream that records every request
//! and response, headers and bodies, as a human-readable audit record.

pub mod audit;
pub mod capture;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use audit::{AuditLog, LogSink, MemorySink};
pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
