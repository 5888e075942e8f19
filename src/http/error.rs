//! Mapping of proxy failures to client responses.
//!
//! - Body read failure → 400 Bad Request (413 when over the capture limit)
//! - Upstream unreachable or failed → 502 Bad Gateway
//! - Upstream deadline exceeded → 504 Gateway Timeout

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::capture::CaptureError;
use crate::http::upstream::UpstreamError;

/// Error type for the forwarding leg.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("could not retarget request: {0}")]
    Rewrite(#[from] UpstreamError),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("upstream did not answer within {0:?}")]
    Timeout(Duration),
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        match self {
            ForwardError::Timeout(_) => {
                (StatusCode::GATEWAY_TIMEOUT, "Upstream timed out").into_response()
            }
            ForwardError::Rewrite(_) | ForwardError::Upstream(_) => {
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }
}

impl IntoResponse for CaptureError {
    fn into_response(self) -> Response {
        match self {
            CaptureError::TooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response()
            }
            CaptureError::Read(_) => {
                (StatusCode::BAD_REQUEST, "Failed to read request body").into_response()
            }
            CaptureError::Transition { .. } => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}
