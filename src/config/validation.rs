//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits and timeouts > 0, request cap bounded)
//! - Keep auxiliary listeners (metrics) on loopback
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AutomationConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AutomationConfig;

const MIN_REQUEST_BYTES: usize = 1024;
const MAX_REQUEST_BYTES: usize = 16 * 1024 * 1024;
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &AutomationConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let listener = &config.listener;
    if listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be greater than 0"));
    }
    if !(MIN_REQUEST_BYTES..=MAX_REQUEST_BYTES).contains(&listener.max_request_bytes) {
        errors.push(ValidationError::new(
            "listener.max_request_bytes",
            format!("must be between {} and {}", MIN_REQUEST_BYTES, MAX_REQUEST_BYTES),
        ));
    }

    for (field, value) in [
        ("timeouts.read_secs", config.timeouts.read_secs),
        ("timeouts.write_secs", config.timeouts.write_secs),
        ("timeouts.handler_secs", config.timeouts.handler_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    let limits = &config.rate_limit;
    if limits.enabled && (limits.requests_per_second == 0 || limits.burst_size == 0) {
        errors.push(ValidationError::new(
            "rate_limit",
            "requests_per_second and burst_size must be positive when enabled",
        ));
    }

    let obs = &config.observability;
    if !LOG_LEVELS.contains(&obs.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", obs.log_level),
        ));
    }
    match obs.metrics_address.parse::<SocketAddr>() {
        Ok(addr) if !addr.ip().is_loopback() => errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a loopback address",
        )),
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new("observability.metrics_address", e.to_string())),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_config(&AutomationConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_problem() {
        let mut config = AutomationConfig::default();
        config.listener.max_connections = 0;
        config.listener.max_request_bytes = 10;
        config.timeouts.write_secs = 0;
        config.rate_limit.requests_per_second = 0;
        config.observability.log_level = "loud".into();
        config.observability.metrics_address = "0.0.0.0:9464".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.max_connections",
                "listener.max_request_bytes",
                "timeouts.write_secs",
                "rate_limit",
                "observability.log_level",
                "observability.metrics_address",
            ]
        );
    }

    #[test]
    fn disabled_rate_limit_may_be_zero() {
        let mut config = AutomationConfig::default();
        config.rate_limit.enabled = false;
        config.rate_limit.requests_per_second = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn unparseable_metrics_address() {
        let mut config = AutomationConfig::default();
        config.observability.metrics_address = "localhost".into();
        assert!(validate_config(&config).is_err());
    }
}
