//! Capture subsystem: duplicate request and response bytes for auditing.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → exchange.rs (Created: peer + arrival time)
//!     → replay.rs (drain body, hand back an identical one)
//!     → snapshot.rs (RequestSnapshot, RequestCaptured)
//!     → [forwarded upstream]
//!     → tee.rs (Forwarding: body frames copied as they are delivered)
//!     → exchange.rs (Complete: one LogRecord emitted)
//! ```
//!
//! # Design Decisions
//! - Everything here is request-local; nothing is shared between requests
//! - The client path never waits on or fails because of the capture path

pub mod exchange;
pub mod replay;
pub mod snapshot;
pub mod tee;

pub use exchange::{Exchange, ExchangeState};
pub use replay::{replay_request, BodyReplay};
pub use snapshot::{now, LogRecord, RequestSnapshot, ResponseCapture};
pub use tee::{ResponseTee, TeeBody};

/// Error type for request capture.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to read request body: {0}")]
    Read(#[source] axum::Error),

    #[error("request body exceeds capture limit of {limit} bytes")]
    TooLarge { limit: usize },

    #[error("illegal exchange transition from {from:?} to {to:?}")]
    Transition {
        from: ExchangeState,
        to: ExchangeState,
    },
}
