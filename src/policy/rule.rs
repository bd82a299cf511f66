//! Header rules.
//!
//! # Responsibilities
//! - Define the closed set of response headers a policy may set
//! - Pair a known header with a validated value
//! - Convert rules to `http` header types for the response pipeline
//!
//! # Design Decisions
//! - Header names are an enum, not free strings: a typo in a policy is a
//!   config error, not a silently ignored header
//! - Values are validated once, at construction

use std::fmt;
use std::str::FromStr;

use axum::http::{HeaderName, HeaderValue};
use serde::Serialize;

use crate::policy::PolicyError;

/// Response headers a policy is allowed to set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownHeader {
    ContentSecurityPolicy,
    ContentSecurityPolicyReportOnly,
    XFrameOptions,
    XContentTypeOptions,
    XXssProtection,
    ReferrerPolicy,
    StrictTransportSecurity,
    PermissionsPolicy,
    CrossOriginOpenerPolicy,
    CrossOriginResourcePolicy,
    CrossOriginEmbedderPolicy,
}

impl KnownHeader {
    pub const ALL: [KnownHeader; 11] = [
        KnownHeader::ContentSecurityPolicy,
        KnownHeader::ContentSecurityPolicyReportOnly,
        KnownHeader::XFrameOptions,
        KnownHeader::XContentTypeOptions,
        KnownHeader::XXssProtection,
        KnownHeader::ReferrerPolicy,
        KnownHeader::StrictTransportSecurity,
        KnownHeader::PermissionsPolicy,
        KnownHeader::CrossOriginOpenerPolicy,
        KnownHeader::CrossOriginResourcePolicy,
        KnownHeader::CrossOriginEmbedderPolicy,
    ];

    /// Canonical casing, as emitted in `headers` output and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownHeader::ContentSecurityPolicy => "Content-Security-Policy",
            KnownHeader::ContentSecurityPolicyReportOnly => "Content-Security-Policy-Report-Only",
            KnownHeader::XFrameOptions => "X-Frame-Options",
            KnownHeader::XContentTypeOptions => "X-Content-Type-Options",
            KnownHeader::XXssProtection => "X-XSS-Protection",
            KnownHeader::ReferrerPolicy => "Referrer-Policy",
            KnownHeader::StrictTransportSecurity => "Strict-Transport-Security",
            KnownHeader::PermissionsPolicy => "Permissions-Policy",
            KnownHeader::CrossOriginOpenerPolicy => "Cross-Origin-Opener-Policy",
            KnownHeader::CrossOriginResourcePolicy => "Cross-Origin-Resource-Policy",
            KnownHeader::CrossOriginEmbedderPolicy => "Cross-Origin-Embedder-Policy",
        }
    }

    /// Wire name. `http` stores header names lowercased.
    pub fn header_name(&self) -> HeaderName {
        HeaderName::from_static(match self {
            KnownHeader::ContentSecurityPolicy => "content-security-policy",
            KnownHeader::ContentSecurityPolicyReportOnly => "content-security-policy-report-only",
            KnownHeader::XFrameOptions => "x-frame-options",
            KnownHeader::XContentTypeOptions => "x-content-type-options",
            KnownHeader::XXssProtection => "x-xss-protection",
            KnownHeader::ReferrerPolicy => "referrer-policy",
            KnownHeader::StrictTransportSecurity => "strict-transport-security",
            KnownHeader::PermissionsPolicy => "permissions-policy",
            KnownHeader::CrossOriginOpenerPolicy => "cross-origin-opener-policy",
            KnownHeader::CrossOriginResourcePolicy => "cross-origin-resource-policy",
            KnownHeader::CrossOriginEmbedderPolicy => "cross-origin-embedder-policy",
        })
    }
}

impl FromStr for KnownHeader {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        KnownHeader::ALL
            .into_iter()
            .find(|h| h.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| PolicyError::UnknownHeader(trimmed.to_string()))
    }
}

impl fmt::Display for KnownHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for KnownHeader {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A single header assignment within a policy set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderRule {
    #[serde(rename = "key")]
    name: KnownHeader,
    value: String,
}

impl HeaderRule {
    /// Create a rule, rejecting values that are not legal header values.
    pub fn new(name: KnownHeader, value: impl Into<String>) -> Result<Self, PolicyError> {
        let value = value.into();
        if HeaderValue::from_str(&value).is_err() || value.trim() != value || value.is_empty() {
            return Err(PolicyError::InvalidValue {
                header: name.as_str(),
                value,
            });
        }
        Ok(Self { name, value })
    }

    pub fn name(&self) -> KnownHeader {
        self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Convert to the pair inserted into a response.
    pub fn to_header_pair(&self) -> (HeaderName, HeaderValue) {
        // Checked in `new`; the fallback is unreachable for constructed rules.
        let value = HeaderValue::from_str(&self.value)
            .unwrap_or_else(|_| HeaderValue::from_static(""));
        (self.name.header_name(), value)
    }
}

impl fmt::Display for HeaderRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_header_case_insensitive() {
        assert_eq!(
            "x-frame-options".parse::<KnownHeader>().unwrap(),
            KnownHeader::XFrameOptions
        );
        assert_eq!(
            "STRICT-TRANSPORT-SECURITY".parse::<KnownHeader>().unwrap(),
            KnownHeader::StrictTransportSecurity
        );
    }

    #[test]
    fn test_unknown_header_rejected() {
        let err = "X-Powered-By".parse::<KnownHeader>().unwrap_err();
        assert!(matches!(err, PolicyError::UnknownHeader(ref n) if n == "X-Powered-By"));
    }

    #[test]
    fn test_wire_name_matches_canonical() {
        for header in KnownHeader::ALL {
            assert_eq!(header.header_name().as_str(), header.as_str().to_ascii_lowercase());
        }
    }

    #[test]
    fn test_rule_rejects_control_characters() {
        assert!(HeaderRule::new(KnownHeader::XFrameOptions, "DENY\r\nSet-Cookie: x").is_err());
        assert!(HeaderRule::new(KnownHeader::XFrameOptions, "").is_err());
        assert!(HeaderRule::new(KnownHeader::XFrameOptions, " DENY").is_err());
    }

    #[test]
    fn test_rule_to_header_pair() {
        let rule = HeaderRule::new(KnownHeader::XContentTypeOptions, "nosniff").unwrap();
        let (name, value) = rule.to_header_pair();
        assert_eq!(name, "x-content-type-options");
        assert_eq!(value, "nosniff");
        assert_eq!(rule.to_string(), "X-Content-Type-Options: nosniff");
    }
}
