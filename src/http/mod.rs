//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all handler)
//!     → capture (request snapshot, body replay)
//!     → upstream.rs (retarget URI at the upstream)
//!     → headers.rs (hop-by-hop strip, X-Forwarded-For)
//!     → hyper client (single attempt)
//!     → capture tee → Send to client
//! ```

pub mod error;
pub mod headers;
pub mod server;
pub mod upstream;

pub use error::ForwardError;
pub use server::{AppState, HttpServer};
pub use upstream::{Upstream, UpstreamError};
