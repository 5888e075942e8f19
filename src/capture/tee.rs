//! Response tee: deliver to the client, copy into the capture.
//!
//! # Responsibilities
//! - Snapshot status and headers at the moment the head is finalized
//! - Pass every body frame through to the client untouched
//! - Append a frame to the capture only once the client side accepted it
//! - Complete the exchange when the body ends or is dropped
//!
//! # Design Decisions
//! - hyper pulls frames; asking for the next frame (or reaching the end)
//!   means the previous one was written, so a frame stays "in flight"
//!   until then
//! - hyper stops polling a length-delimited body once the declared length
//!   has been handed over; a frame completing that length is delivered
//! - A dropped body (client gone, write error) otherwise discards the
//!   in-flight frame and logs what was delivered before it
//! - A tee dropped before the response head was sent logs 502
//! - Trailers pass through and are not captured

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Response, StatusCode};
use axum::BoxError;
use http_body::{Body as _, Frame, SizeHint};
use pin_project_lite::pin_project;

use crate::capture::exchange::Exchange;
use crate::capture::snapshot::ResponseCapture;

/// Owns the response capture for one exchange in the `Forwarding` state.
#[derive(Debug)]
pub struct ResponseTee {
    capture: ResponseCapture,
    in_flight: Option<Bytes>,
    handed_out: u64,
    declared_len: Option<u64>,
    head_sent: bool,
    exchange: Exchange,
}

impl ResponseTee {
    pub(crate) fn new(exchange: Exchange) -> Self {
        Self {
            capture: ResponseCapture::new(),
            in_flight: None,
            handed_out: 0,
            declared_len: None,
            head_sent: false,
            exchange,
        }
    }

    /// Record the response status.
    pub fn set_status(&mut self, status: StatusCode) {
        self.capture.set_status(status);
    }

    /// Record the header set exactly as it is being sent.
    pub fn finalize_headers(&mut self, headers: &HeaderMap) {
        self.capture.set_headers(headers);
        self.head_sent = true;
    }

    /// Exact body length the client was promised, if known.
    pub fn declare_length(&mut self, len: Option<u64>) {
        self.declared_len = len;
    }

    /// A chunk was handed to the client. It is captured on confirmation.
    pub fn forwarded(&mut self, chunk: Bytes) {
        self.confirm();
        if !chunk.is_empty() {
            self.handed_out += chunk.len() as u64;
            self.in_flight = Some(chunk);
        }
    }

    /// The client side accepted the in-flight chunk.
    pub fn confirm(&mut self) {
        if let Some(chunk) = self.in_flight.take() {
            self.capture.append(&chunk);
        }
    }

    /// The in-flight chunk was not delivered.
    pub fn abandon(&mut self) {
        self.in_flight = None;
    }

    /// Body released without a further poll. The in-flight chunk counts as
    /// delivered only when it completes the declared length.
    pub fn settle(&mut self) {
        if self.declared_len == Some(self.handed_out) {
            self.confirm();
        } else {
            self.abandon();
        }
    }

    pub fn has_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn capture(&self) -> &ResponseCapture {
        &self.capture
    }

    /// Response fully written: confirm the last chunk and complete.
    pub fn finish(&mut self) {
        self.confirm();
        self.exchange.complete(&self.capture);
    }

    /// Capture the head of `response` and wrap its body in a [`TeeBody`].
    pub fn wrap<B>(mut self, response: Response<B>) -> Response<Body>
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = response.into_parts();
        self.set_status(parts.status);
        self.finalize_headers(&parts.headers);
        self.declare_length(body.size_hint().exact());
        Response::from_parts(parts, Body::new(TeeBody::new(body, self)))
    }
}

impl Drop for ResponseTee {
    fn drop(&mut self) {
        if !self.head_sent {
            self.capture.set_status(StatusCode::BAD_GATEWAY);
        }
        self.settle();
        self.exchange.complete(&self.capture);
    }
}

pin_project! {
    /// Body decorator that copies delivered data frames into a [`ResponseTee`].
    pub struct TeeBody<B> {
        #[pin]
        inner: B,
        tee: ResponseTee,
    }
}

impl<B> TeeBody<B> {
    pub fn new(inner: B, tee: ResponseTee) -> Self {
        Self { inner, tee }
    }
}

impl<B> http_body::Body for TeeBody<B>
where
    B: http_body::Body<Data = Bytes>,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();

        // Being polled again means the previous frame was written.
        this.tee.confirm();

        match ready!(this.inner.poll_frame(cx)) {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    this.tee.forwarded(data.clone());
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Some(Err(e)) => {
                tracing::warn!("Upstream body failed mid-stream");
                Poll::Ready(Some(Err(e)))
            }
            None => {
                this.tee.finish();
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        // Never report the end while a frame awaits confirmation.
        !self.tee.has_in_flight() && self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
