//! Configuration loading from disk and the command line.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values supplied at startup that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub upstream_url: Option<String>,
    pub bind_address: Option<String>,
    pub log_level: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut ProxyConfig) {
        if let Some(url) = self.upstream_url {
            config.upstream.url = url;
        }
        if let Some(address) = self.bind_address {
            config.listener.bind_address = normalize_bind_address(&address);
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
    }
}

/// Expand a bare `:port` into an all-interfaces bind address.
pub fn normalize_bind_address(address: &str) -> String {
    match address.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => address.to_string(),
    }
}

/// Parse configuration from TOML text without validating it.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    resolve_config(Some(path), Overrides::default())
}

/// Build the effective configuration: defaults, then the optional file,
/// then command-line overrides. The result is validated.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: Overrides,
) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => ProxyConfig::default(),
    };

    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
