//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs and value ranges
//! - Check every configured header policy the way the response pipeline
//!   will use it: known names, legal values, compilable patterns, well
//!   formed CSP strings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;
use url::Url;

use crate::config::schema::{GatewayConfig, PolicyConfig};
use crate::policy::{ContentSecurityPolicy, KnownHeader, PolicyError, RouteMatcher};

/// A single semantic problem in a config file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    InvalidBindAddress(String),

    #[error("listener.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("upstream.url '{url}' is invalid: {reason}")]
    InvalidUpstream { url: String, reason: String },

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("observability.log_level '{0}' is not a valid filter")]
    InvalidLogLevel(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("security.policies[{index}]: {error}")]
    Policy { index: usize, error: PolicyError },

    #[error("security.policies[{index}] has no headers")]
    EmptyPolicy { index: usize },

    #[error("security.policies[{index}] sets {header} more than once")]
    DuplicateHeader { index: usize, header: KnownHeader },

    #[error("security.policies[{index}]: {header} value must not end with ';'")]
    TrailingSemicolon { index: usize, header: KnownHeader },
}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if let Some(url) = &config.upstream.url {
        if let Err(reason) = check_upstream(url) {
            errors.push(ValidationError::InvalidUpstream {
                url: url.clone(),
                reason,
            });
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }

    if EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    for (index, policy) in config.security.policies.iter().enumerate() {
        validate_policy(index, policy, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_upstream(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("scheme '{}' is not supported, use http", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.path() != "/" || url.query().is_some() {
        return Err("must not contain a path or query".to_string());
    }
    Ok(())
}

fn validate_policy(index: usize, policy: &PolicyConfig, errors: &mut Vec<ValidationError>) {
    if let Err(error) = RouteMatcher::parse(&policy.source) {
        errors.push(ValidationError::Policy { index, error });
    }

    if policy.headers.is_empty() {
        errors.push(ValidationError::EmptyPolicy { index });
        return;
    }

    let mut seen = HashSet::new();
    for header in &policy.headers {
        let rule = match header.to_rule() {
            Ok(rule) => rule,
            Err(error) => {
                errors.push(ValidationError::Policy { index, error });
                continue;
            }
        };

        let name = rule.name();
        if !seen.insert(name) {
            errors.push(ValidationError::DuplicateHeader { index, header: name });
        }

        if matches!(
            name,
            KnownHeader::ContentSecurityPolicy | KnownHeader::ContentSecurityPolicyReportOnly
        ) {
            if rule.value().ends_with(';') {
                errors.push(ValidationError::TrailingSemicolon { index, header: name });
            }
            if let Err(error) = ContentSecurityPolicy::parse(rule.value()) {
                errors.push(ValidationError::Policy { index, error });
            }
        }
    }
}
