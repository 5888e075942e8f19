//! Per-request capture values.
//!
//! `RequestSnapshot` is built once, before forwarding, and never changes.
//! `ResponseCapture` accumulates as the response is written and is frozen
//! when the exchange completes. `LogRecord` pairs the two for formatting.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::http::{request, HeaderMap, Method, StatusCode, Uri, Version};
use chrono::{DateTime, FixedOffset, Local};

/// Immutable view of an inbound request.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    remote_addr: SocketAddr,
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    received_at: DateTime<FixedOffset>,
}

impl RequestSnapshot {
    /// Snapshot request head and drained body.
    pub fn new(
        remote_addr: SocketAddr,
        parts: &request::Parts,
        body: Bytes,
        received_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            remote_addr,
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            version: parts.version,
            headers: parts.headers.clone(),
            body,
            received_at,
        }
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn received_at(&self) -> DateTime<FixedOffset> {
        self.received_at
    }

    /// User component of the request target's userinfo, if any.
    pub fn user(&self) -> Option<&str> {
        let authority = self.uri.authority()?.as_str();
        let (userinfo, _) = authority.rsplit_once('@')?;
        let user = userinfo.split(':').next().unwrap_or(userinfo);
        (!user.is_empty()).then_some(user)
    }
}

/// Response metadata and body as delivered to the client.
#[derive(Debug, Clone)]
pub struct ResponseCapture {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Default for ResponseCapture {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }
}

impl ResponseCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub(crate) fn set_headers(&mut self, headers: &HeaderMap) {
        self.headers = headers.clone();
    }

    pub(crate) fn append(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Number of body bytes delivered to the client.
    pub fn size(&self) -> usize {
        self.body.len()
    }
}

/// A finished exchange, ready to be rendered.
#[derive(Debug)]
pub struct LogRecord<'a> {
    pub request: &'a RequestSnapshot,
    pub response: &'a ResponseCapture,
    pub timestamp: DateTime<FixedOffset>,
}

impl<'a> LogRecord<'a> {
    /// Pair a snapshot with its capture, stamped with the request's arrival.
    pub fn new(request: &'a RequestSnapshot, response: &'a ResponseCapture) -> Self {
        Self {
            request,
            response,
            timestamp: request.received_at(),
        }
    }
}

/// Current wall-clock time in the local zone.
pub fn now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}
