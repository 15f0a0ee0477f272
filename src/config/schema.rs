//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! automation server. All types derive Serde traits for deserialization
//! from config files.

use serde::{Deserialize, Serialize};

/// Default port for the local automation API.
pub const DEFAULT_PORT: u16 = 23120;

/// Root configuration for the automation server.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Listener configuration (port, limits).
    pub listener: ListenerConfig,

    /// Receive/send/handler deadlines.
    pub timeouts: TimeoutConfig,

    /// The automation gate.
    pub automation: GateConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Pause between stop and start on restart, letting the OS release the port.
    pub restart_delay_ms: u64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            automation: GateConfig::default(),
            rate_limit: RateLimitConfig::default(),
            observability: ObservabilityConfig::default(),
            restart_delay_ms: 250,
        }
    }
}

/// Listener configuration. The bind address is always loopback.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// TCP port on 127.0.0.1; 0 picks an ephemeral port.
    pub port: u16,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// Upper bound on request head plus body, in bytes.
    pub max_request_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_connections: 64,
            max_request_bytes: 64 * 1024,
        }
    }
}

/// Timeout configuration for connection phases.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time allowed for the full request to arrive.
    pub read_secs: u64,

    /// Time allowed for the response to be written.
    pub write_secs: u64,

    /// Time allowed for the handler (and its library call).
    pub handler_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: 10,
            write_secs: 10,
            handler_secs: 30,
        }
    }
}

/// Automation gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Enable the automation API. Off unless the user opts in.
    pub enabled: bool,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Sustained requests per second per peer.
    pub requests_per_second: u32,

    /// Burst capacity.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 20,
            burst_size: 40,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9464".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: AutomationConfig = toml::from_str("").unwrap();
        assert_eq!(config, AutomationConfig::default());
        assert!(!config.automation.enabled);
        assert_eq!(config.listener.port, DEFAULT_PORT);
        assert_eq!(config.listener.max_request_bytes, 65536);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: AutomationConfig = toml::from_str(
            r#"
            [listener]
            port = 0

            [automation]
            enabled = true
            "#,
        )
        .unwrap();
        assert_eq!(config.listener.port, 0);
        assert_eq!(config.listener.max_connections, 64);
        assert!(config.automation.enabled);
        assert_eq!(config.timeouts, TimeoutConfig::default());
    }
}
