//! Upstream target and request URI rewriting.
//!
//! # Responsibilities
//! - Parse the configured upstream URL once at startup
//! - Point inbound request targets at the upstream scheme/authority
//! - Join the upstream base path and query with the request's own
//!
//! # Design Decisions
//! - Only plain `http` upstreams; TLS is out of scope
//! - Path joins collapse to exactly one `/` at the seam

use std::fmt;
use std::str::FromStr;

use axum::http::uri::{Authority, InvalidUri, PathAndQuery, Scheme};
use axum::http::Uri;
use url::Url;

/// Error type for upstream parsing and URI rewriting.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("unsupported scheme {0:?} (only http is supported)")]
    UnsupportedScheme(String),

    #[error("url has no host")]
    MissingHost,

    #[error("invalid authority or path: {0}")]
    InvalidUri(#[from] InvalidUri),

    #[error("could not build upstream uri: {0}")]
    Build(#[from] axum::http::Error),
}

/// The single upstream every request is forwarded to.
#[derive(Debug, Clone)]
pub struct Upstream {
    authority: Authority,
    base_path: String,
    base_query: Option<String>,
}

impl Upstream {
    /// Parse an upstream URL such as `http://127.0.0.1:3000/api`.
    pub fn parse(raw: &str) -> Result<Self, UpstreamError> {
        let url = Url::parse(raw)?;

        if url.scheme() != "http" {
            return Err(UpstreamError::UnsupportedScheme(url.scheme().to_string()));
        }

        let host = url.host_str().ok_or(UpstreamError::MissingHost)?;
        let authority = match url.port() {
            Some(port) => Authority::from_str(&format!("{}:{}", host, port))?,
            None => Authority::from_str(host)?,
        };

        Ok(Self {
            authority,
            base_path: url.path().to_string(),
            base_query: url.query().filter(|q| !q.is_empty()).map(str::to_string),
        })
    }

    /// Authority (host and optional port) of the upstream.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Rewrite an inbound request target so it addresses the upstream.
    pub fn rewrite(&self, uri: &Uri) -> Result<Uri, UpstreamError> {
        let path = join_paths(&self.base_path, uri.path());

        let query = match (self.base_query.as_deref(), uri.query()) {
            (Some(base), Some(req)) if !req.is_empty() => Some(format!("{}&{}", base, req)),
            (Some(base), _) => Some(base.to_string()),
            (None, Some(req)) => Some(req.to_string()),
            (None, None) => None,
        };

        let path_and_query = match query {
            Some(q) => PathAndQuery::from_str(&format!("{}?{}", path, q))?,
            None => PathAndQuery::from_str(&path)?,
        };

        Ok(Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()?)
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http://{}{}", self.authority, self.base_path)?;
        if let Some(q) = &self.base_query {
            write!(f, "?{}", q)?;
        }
        Ok(())
    }
}

/// Join two path segments with exactly one slash at the seam.
fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}
