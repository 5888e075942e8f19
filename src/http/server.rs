//! HTTP server setup and the forwarding handler.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all handler
//! - Capture each request before it leaves and tee each response back
//! - Forward requests to the one configured upstream
//! - Bind server to listener with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, Response, Version},
    response::IntoResponse,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::audit::{AuditLog, LogSink};
use crate::capture::Exchange;
use crate::config::ProxyConfig;
use crate::http::error::ForwardError;
use crate::http::headers::{append_forwarded_for, strip_hop_by_hop};
use crate::http::upstream::{Upstream, UpstreamError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<Upstream>,
    pub client: Client<HttpConnector, Body>,
    pub audit: AuditLog,
    pub request_body_limit: usize,
    pub forwarded_for: bool,
    pub upstream_timeout: Option<Duration>,
}

/// HTTP server for the audit proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server forwarding to the configured upstream and writing
    /// audit records to `sink`.
    pub fn new(config: ProxyConfig, sink: Arc<dyn LogSink>) -> Result<Self, UpstreamError> {
        let upstream = Arc::new(Upstream::parse(&config.upstream.url)?);

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            upstream,
            client,
            audit: AuditLog::new(sink),
            request_body_limit: config.capture.request_body_limit(),
            forwarded_for: config.upstream.forwarded_for,
            upstream_timeout: config.timeouts.upstream_secs.map(Duration::from_secs),
        };

        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
    }

    /// The configured router, for serving on a custom transport.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.url,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler.
/// Captures the request, forwards it, and tees the response.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> axum::response::Response {
    let start_time = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let mut exchange = Exchange::new(addr, state.audit.clone());

    let request = match exchange
        .capture_request(request, state.request_body_limit)
        .await
    {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(peer = %addr, method = %method, path = %path, error = %e, "Request capture failed");
            return e.into_response();
        }
    };

    let tee = match exchange.begin_forwarding() {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "Exchange out of order");
            return e.into_response();
        }
    };

    let response = match forward(&state, addr, request).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(
                peer = %addr,
                upstream = %state.upstream.authority(),
                method = %method,
                path = %path,
                error = %e,
                "Upstream error"
            );
            e.into_response()
        }
    };

    tracing::debug!(
        method = %method,
        path = %path,
        status = %response.status(),
        elapsed = ?start_time.elapsed(),
        "Upstream responded"
    );

    tee.wrap(response)
}

/// Send `request` to the upstream and return its response for streaming.
///
/// Exactly one attempt is made.
pub async fn forward(
    state: &AppState,
    client_addr: SocketAddr,
    request: Request<Body>,
) -> Result<Response<Body>, ForwardError> {
    let (mut parts, body) = request.into_parts();

    parts.uri = state.upstream.rewrite(&parts.uri)?;
    parts.version = Version::HTTP_11;
    strip_hop_by_hop(&mut parts.headers);
    if state.forwarded_for {
        append_forwarded_for(&mut parts.headers, client_addr.ip());
    }

    let pending = state.client.request(Request::from_parts(parts, body));
    let response = match state.upstream_timeout {
        Some(limit) => tokio::time::timeout(limit, pending)
            .await
            .map_err(|_| ForwardError::Timeout(limit))??,
        None => pending.await?,
    };

    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Ok(Response::from_parts(parts, Body::new(body)))
}
