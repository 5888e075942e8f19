//! Request body capture and replay.
//!
//! # Responsibilities
//! - Drain the inbound body to completion into one buffer
//! - Hand back a fresh body over that buffer for forwarding
//!
//! # Design Decisions
//! - The whole body is held in memory; an optional limit bounds it
//! - The original body is consumed; only the replacement may be used
//! - A read failure yields no capture at all

use axum::body::{Body, Bytes};
use axum::http::Request;
use futures_util::StreamExt;

use crate::capture::CaptureError;

/// A fully drained request body that can be re-read.
#[derive(Debug, Clone, Default)]
pub struct BodyReplay {
    bytes: Bytes,
}

impl BodyReplay {
    /// Read `body` to the end, failing if it exceeds `limit` bytes.
    pub async fn drain(body: Body, limit: usize) -> Result<Self, CaptureError> {
        let mut stream = body.into_data_stream();
        let mut buf: Vec<u8> = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(CaptureError::Read)?;
            if buf.len().saturating_add(chunk.len()) > limit {
                return Err(CaptureError::TooLarge { limit });
            }
            buf.extend_from_slice(&chunk);
        }

        Ok(Self {
            bytes: Bytes::from(buf),
        })
    }

    /// The captured bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// A new body yielding exactly the captured bytes.
    pub fn replay(&self) -> Body {
        Body::from(self.bytes.clone())
    }
}

/// Drain a request's body and put an identical one back.
///
/// Returns the captured bytes and the restored request.
pub async fn replay_request(
    request: Request<Body>,
    limit: usize,
) -> Result<(Bytes, Request<Body>), CaptureError> {
    let (parts, body) = request.into_parts();
    let replay = BodyReplay::drain(body, limit).await?;
    let restored = Request::from_parts(parts, replay.replay());
    Ok((replay.bytes, restored))
}
