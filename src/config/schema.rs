//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::policy::{
    default_table, HeaderRule, KnownHeader, PolicyError, PolicySet, PolicyTable, RouteMatcher,
};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Application the gateway fronts.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Response header policy.
    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Upstream application settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the application, e.g. "http://127.0.0.1:3000".
    /// Without one the gateway answers every path itself with 404.
    pub url: Option<String>,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security header configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enabled: bool,

    /// Header policies. Empty means the built-in policy.
    pub policies: Vec<PolicyConfig>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            policies: Vec::new(),
        }
    }
}

impl SecurityConfig {
    /// The table the gateway will serve, or `None` when headers are disabled.
    pub fn active_table(&self) -> Result<Option<PolicyTable>, PolicyError> {
        if !self.enabled {
            return Ok(None);
        }
        self.policy_table().map(Some)
    }

    /// Build the policy table this config describes.
    ///
    /// Stops at the first error; `validation::validate_config` reports all.
    pub fn policy_table(&self) -> Result<PolicyTable, PolicyError> {
        if self.policies.is_empty() {
            return Ok(default_table());
        }

        let sets = self
            .policies
            .iter()
            .map(PolicyConfig::to_policy_set)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PolicyTable::new(sets))
    }
}

/// One `[[security.policies]]` entry: a path pattern and its headers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyConfig {
    /// Path glob, e.g. "/**" or "/api/**".
    pub source: String,

    /// Headers to set on matching responses, in order.
    #[serde(default)]
    pub headers: Vec<HeaderConfig>,
}

impl PolicyConfig {
    pub fn to_policy_set(&self) -> Result<PolicySet, PolicyError> {
        let matcher = RouteMatcher::parse(&self.source)?;
        let rules = self
            .headers
            .iter()
            .map(HeaderConfig::to_rule)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PolicySet::new(matcher, rules))
    }
}

/// A header name/value pair as written in config.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeaderConfig {
    pub key: String,
    pub value: String,
}

impl HeaderConfig {
    pub fn to_rule(&self) -> Result<HeaderRule, PolicyError> {
        let name: KnownHeader = self.key.parse()?;
        HeaderRule::new(name, self.value.clone())
    }
}
