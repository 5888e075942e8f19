//! Per-request capture lifecycle.
//!
//! # States
//! ```text
//! Created ──capture_request──▶ RequestCaptured ──begin_forwarding──▶ Forwarding
//!                                                                       │
//!                                       ResponseTee finished or dropped │
//!                                                                       ▼
//!                                                                   Complete
//! ```
//!
//! Entering `Complete` emits the audit record. It happens once.

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::Request;
use chrono::{DateTime, FixedOffset};

use crate::audit::AuditLog;
use crate::capture::replay::replay_request;
use crate::capture::snapshot::{now, LogRecord, RequestSnapshot, ResponseCapture};
use crate::capture::tee::ResponseTee;
use crate::capture::CaptureError;

/// Lifecycle position of one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// Arrival time and peer recorded.
    Created,
    /// Body drained and snapshot taken.
    RequestCaptured,
    /// Upstream exchange in progress; the tee owns the capture.
    Forwarding,
    /// Response finished; record emitted.
    Complete,
}

impl ExchangeState {
    /// The only state reachable from this one.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Created => Some(Self::RequestCaptured),
            Self::RequestCaptured => Some(Self::Forwarding),
            Self::Forwarding => Some(Self::Complete),
            Self::Complete => None,
        }
    }
}

/// One request/response exchange being captured.
#[derive(Debug)]
pub struct Exchange {
    state: ExchangeState,
    remote_addr: SocketAddr,
    started_at: DateTime<FixedOffset>,
    snapshot: Option<RequestSnapshot>,
    audit: AuditLog,
}

impl Exchange {
    /// Start an exchange for a request from `remote_addr`.
    pub fn new(remote_addr: SocketAddr, audit: AuditLog) -> Self {
        Self {
            state: ExchangeState::Created,
            remote_addr,
            started_at: now(),
            snapshot: None,
            audit,
        }
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> Option<&RequestSnapshot> {
        self.snapshot.as_ref()
    }

    fn advance(&mut self, to: ExchangeState) -> Result<(), CaptureError> {
        if self.state.next() != Some(to) {
            return Err(CaptureError::Transition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Drain and snapshot the request, returning it with a replayed body.
    pub async fn capture_request(
        &mut self,
        request: Request<Body>,
        limit: usize,
    ) -> Result<Request<Body>, CaptureError> {
        if self.state != ExchangeState::Created {
            return Err(CaptureError::Transition {
                from: self.state,
                to: ExchangeState::RequestCaptured,
            });
        }

        let (body, restored) = replay_request(request, limit).await?;
        let (parts, replayed) = restored.into_parts();
        self.snapshot = Some(RequestSnapshot::new(
            self.remote_addr,
            &parts,
            body,
            self.started_at,
        ));
        self.advance(ExchangeState::RequestCaptured)?;

        Ok(Request::from_parts(parts, replayed))
    }

    /// Hand the exchange to a tee for the response leg.
    pub fn begin_forwarding(mut self) -> Result<ResponseTee, CaptureError> {
        self.advance(ExchangeState::Forwarding)?;
        Ok(ResponseTee::new(self))
    }

    /// Move to `Complete` and emit the record. Later calls do nothing.
    pub(crate) fn complete(&mut self, capture: &ResponseCapture) {
        if self.advance(ExchangeState::Complete).is_err() {
            return;
        }
        if let Some(snapshot) = &self.snapshot {
            self.audit.emit(&LogRecord::new(snapshot, capture));
        }
    }
}
