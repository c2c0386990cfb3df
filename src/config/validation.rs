//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, batch timeouts > 0)
//! - Validate addresses, the webhook URL and custom MIME values
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ServerConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be > 0"));
    }

    if !config.mount.route.starts_with('/') {
        errors.push(ValidationError::new("mount.route", "must start with '/'"));
    }
    for rule in &config.mount.redirects {
        if !rule.from.starts_with('/') || !rule.to.starts_with('/') {
            errors.push(ValidationError::new(
                "mount.redirects",
                format!("'{}' -> '{}' must both be absolute routes", rule.from, rule.to),
            ));
        }
    }

    let rate = &config.rate_limit;
    if rate.enabled {
        if rate.max_requests == 0 {
            errors.push(ValidationError::new("rate_limit.max_requests", "must be > 0"));
        }
        if rate.window.is_zero() {
            errors.push(ValidationError::new("rate_limit.window_ms", "must be > 0"));
        }
    }

    for (ext, mime) in &config.headers.custom_mime_types {
        if !ext.starts_with('.') {
            errors.push(ValidationError::new(
                "headers.custom_mime_types",
                format!("extension '{}' must start with '.'", ext),
            ));
        }
        if mime.parse::<mime_guess::mime::Mime>().is_err() {
            errors.push(ValidationError::new(
                "headers.custom_mime_types",
                format!("'{}' is not a MIME type", mime),
            ));
        }
    }

    let security = &config.security;
    if !security.webhook_url.is_empty() {
        match Url::parse(&security.webhook_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(ValidationError::new(
                "security.webhook_url",
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new("security.webhook_url", e.to_string())),
        }
    }
    if security.webhook_timeout.is_zero() {
        errors.push(ValidationError::new("security.webhook_timeout_ms", "must be > 0"));
    }
    if security.batch_size > 0 && security.batch_timeout.is_zero() {
        errors.push(ValidationError::new(
            "security.batch_timeout_ms",
            "must be > 0 when batching is enabled",
        ));
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
