//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the upstream URL is a usable plain-HTTP target
//! - Validate value ranges (limits and timeouts > 0, bind address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;
use crate::http::upstream::{Upstream, UpstreamError};

/// A single semantic problem with a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("upstream url is required")]
    MissingUpstream,

    #[error("upstream url: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("invalid bind address {address:?}: {reason}")]
    BindAddress { address: String, reason: String },

    #[error("capture.max_request_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("timeouts.upstream_secs must be greater than zero")]
    ZeroUpstreamTimeout,

    #[error("unknown log level {0:?}")]
    LogLevel(String),
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.upstream.url.trim().is_empty() {
        errors.push(ValidationError::MissingUpstream);
    } else if let Err(e) = Upstream::parse(&config.upstream.url) {
        errors.push(e.into());
    }

    if let Err(e) = config.listener.bind_address.parse::<SocketAddr>() {
        errors.push(ValidationError::BindAddress {
            address: config.listener.bind_address.clone(),
            reason: e.to_string(),
        });
    }

    if config.capture.max_request_body_bytes == Some(0) {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if config.timeouts.upstream_secs == Some(0) {
        errors.push(ValidationError::ZeroUpstreamTimeout);
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::LogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
